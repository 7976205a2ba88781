use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use talkinghead_config::{PreprocessMode, ToolkitConfig};
use tokio::{io::AsyncWriteExt, process::Command};

use super::{AudioBatch, InitPaths, RenderBatch, RenderTarget, SourceCoefficients, StageContext, Toolkit};
use crate::{
    device::Device,
    error::{GenerateError, Result},
};

/// Lines of stderr kept in a stage failure message
const STDERR_TAIL_LINES: usize = 20;

/// Runs every heavyweight stage as a fresh toolkit process
///
/// The process is `<program> <script> <stage>`. It receives one JSON
/// document on stdin and answers with a JSON object on the last non-empty
/// line of stdout, or `{"error": "..."}`. Relative paths in the answer are
/// taken relative to the configured working directory.
pub struct ScriptToolkit {
    program: String,
    script: PathBuf,
    working_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct StageRequest<'a, I> {
    stage: &'static str,
    paths: &'a InitPaths,
    device: Device,
    input: &'a I,
}

#[derive(Serialize)]
struct ExtractInput<'a> {
    image_path: &'a Path,
    save_dir: &'a Path,
    preprocess: PreprocessMode,
    source_image: bool,
}

#[derive(Deserialize)]
struct ExtractReply {
    coeff_path: Option<PathBuf>,
    #[serde(default)]
    crop_pic_path: Option<PathBuf>,
    #[serde(default)]
    crop_info: Value,
}

#[derive(Serialize)]
struct PredictInput<'a> {
    batch: &'a AudioBatch,
    save_dir: &'a Path,
    pose_style: u32,
    ref_pose: Option<&'a Path>,
}

#[derive(Deserialize)]
struct PredictReply {
    coeff_path: PathBuf,
}

#[derive(Serialize)]
struct RenderInput<'a> {
    batch: &'a RenderBatch,
    save_dir: &'a Path,
    #[serde(flatten)]
    target: &'a RenderTarget<'a>,
}

#[derive(Deserialize)]
struct RenderReply {
    video_path: PathBuf,
}

impl ScriptToolkit {
    /// A relative script path is taken from the server's current directory,
    /// so it still resolves when stages run inside `working_dir`
    pub fn new(config: &ToolkitConfig) -> Self {
        let script = if config.script.is_relative() {
            let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            base_dir.join(&config.script)
        } else {
            config.script.clone()
        };

        Self {
            program: config.program.clone(),
            script,
            working_dir: config.working_dir.clone(),
        }
    }

    /// Run one stage process and decode its reply
    async fn invoke<I, O>(&self, stage: &'static str, ctx: &StageContext, input: &I) -> Result<O>
    where
        I: Serialize + Sync,
        O: DeserializeOwned,
    {
        let request = StageRequest {
            stage,
            paths: &ctx.paths,
            device: ctx.device,
            input,
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|e| GenerateError::Toolkit(format!("failed to encode {stage} request: {e}")))?;

        let mut command = Command::new(&self.program);
        command
            .arg(&self.script)
            .arg(stage)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // requests run detached from their connection, so this only fires on runtime shutdown
            .kill_on_drop(true);

        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        tracing::debug!(stage, program = %self.program, script = %self.script.display(), "launching toolkit stage");

        let mut child = command
            .spawn()
            .map_err(|e| GenerateError::Toolkit(format!("failed to launch {stage} stage: {e}")))?;

        // Feed stdin concurrently so a chatty stage cannot fill stdout first
        let stdin = child.stdin.take();
        let writer = tokio::spawn(async move {
            if let Some(mut stdin) = stdin
                && let Err(e) = stdin.write_all(&payload).await
            {
                tracing::debug!(stage, error = %e, "stage closed stdin early");
            }
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GenerateError::Toolkit(format!("failed to wait for {stage} stage: {e}")))?;
        writer.await.ok();

        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(GenerateError::Toolkit(format!(
                "{stage} stage exited with {}: {}",
                output.status,
                tail(&stderr, STDERR_TAIL_LINES)
            )));
        }

        if !stderr.trim().is_empty() {
            tracing::trace!(stage, stderr = %stderr, "toolkit stage stderr");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        decode_reply(stage, &stdout)
    }

    fn resolve(&self, path: PathBuf) -> PathBuf {
        match self.working_dir {
            Some(ref dir) if path.is_relative() => dir.join(path),
            _ => path,
        }
    }
}

#[async_trait]
impl Toolkit for ScriptToolkit {
    async fn extract(
        &self,
        ctx: &StageContext,
        image: &Path,
        save_dir: &Path,
        preprocess: PreprocessMode,
        source_image: bool,
    ) -> Result<Option<SourceCoefficients>> {
        let input = ExtractInput {
            image_path: image,
            save_dir,
            preprocess,
            source_image,
        };

        let reply: ExtractReply = self.invoke("extract", ctx, &input).await?;

        let Some(coeff_path) = reply.coeff_path else {
            return Ok(None);
        };

        let crop_pic_path = reply
            .crop_pic_path
            .ok_or_else(|| GenerateError::Toolkit("extract stage returned coefficients without a crop".to_string()))?;

        Ok(Some(SourceCoefficients {
            coeff_path: self.resolve(coeff_path),
            crop_pic_path: self.resolve(crop_pic_path),
            crop_info: reply.crop_info,
        }))
    }

    async fn predict(
        &self,
        ctx: &StageContext,
        batch: AudioBatch,
        save_dir: &Path,
        pose_style: u32,
        ref_pose: Option<&Path>,
    ) -> Result<PathBuf> {
        let input = PredictInput {
            batch: &batch,
            save_dir,
            pose_style,
            ref_pose,
        };

        let reply: PredictReply = self.invoke("predict", ctx, &input).await?;

        Ok(self.resolve(reply.coeff_path))
    }

    async fn render(
        &self,
        ctx: &StageContext,
        batch: RenderBatch,
        save_dir: &Path,
        target: RenderTarget<'_>,
    ) -> Result<PathBuf> {
        let input = RenderInput {
            batch: &batch,
            save_dir,
            target: &target,
        };

        let reply: RenderReply = self.invoke("render", ctx, &input).await?;

        Ok(self.resolve(reply.video_path))
    }

    fn name(&self) -> &str {
        "script"
    }
}

/// Decode the last non-empty stdout line as the stage reply
fn decode_reply<O: DeserializeOwned>(stage: &str, stdout: &str) -> Result<O> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| GenerateError::Toolkit(format!("{stage} stage produced no output")))?;

    let value: Value = serde_json::from_str(line)
        .map_err(|e| GenerateError::Toolkit(format!("{stage} stage reply is not JSON: {e}")))?;

    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(GenerateError::Toolkit(format!("{stage} stage reported: {message}")));
    }

    serde_json::from_value(value).map_err(|e| GenerateError::Toolkit(format!("unexpected {stage} stage reply: {e}")))
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
