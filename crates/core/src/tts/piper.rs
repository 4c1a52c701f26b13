use crate::markup::to_plain_text;
use crate::tts::{ProviderError, ProviderRequest, TtsProvider};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const MODEL_EXTENSION: &str = "onnx";
const LOG_TARGET: &str = "tts::piper";

/// Offline fallback backed by a local `piper` binary. Voice ids name model
/// files inside `model_dir`.
#[derive(Clone, Debug)]
pub struct PiperProvider {
    piper_binary: PathBuf,
    model_dir: PathBuf,
}

impl PiperProvider {
    #[must_use]
    pub fn new(piper_binary: PathBuf, model_dir: PathBuf) -> Self {
        Self {
            piper_binary,
            model_dir,
        }
    }
}

// Piper's length scale is the inverse of speaking rate.
fn length_scale(rate: f32) -> String {
    format!("{:.2}", 1.0 / rate.clamp(0.5, 2.0))
}

impl TtsProvider for PiperProvider {
    fn try_synthesize(&self, request: ProviderRequest) -> BoxFuture<'_, Result<Bytes, ProviderError>> {
        async move {
            let voice = &request.voice.0;
            if voice.is_empty() || voice.contains(['/', '\\']) || voice.contains("..") {
                return Err(ProviderError::Transport(format!("invalid piper voice id {voice:?}")));
            }
            let model_path = self.model_dir.join(format!("{voice}.{MODEL_EXTENSION}"));
            let text = to_plain_text(&request.markup);
            tracing::debug!(target: LOG_TARGET, model = %model_path.display(), "spawning piper");

            // kill_on_drop: a timed-out attempt drops this future and must not
            // leave the process running.
            let mut child = Command::new(&self.piper_binary)
                .arg("--model")
                .arg(&model_path)
                .arg("--output_raw")
                .arg("--length_scale")
                .arg(length_scale(request.prosody.rate))
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| {
                    let path = self.piper_binary.display();
                    ProviderError::Transport(format!("failed to spawn piper at {path}: {e}"))
                })?;

            {
                let stdin = child
                    .stdin
                    .as_mut()
                    .ok_or_else(|| ProviderError::Transport("failed to open piper stdin".into()))?;
                stdin
                    .write_all(text.as_bytes())
                    .await
                    .map_err(|e| ProviderError::Transport(format!("piper stdin write failed: {e}")))?;
            }
            child.stdin.take();

            let output = child
                .wait_with_output()
                .await
                .map_err(|e| ProviderError::Transport(format!("piper process failed: {e}")))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let status = output.status;
                return Err(ProviderError::Transport(format!(
                    "piper exited with {status}: {}",
                    stderr.trim()
                )));
            }

            Ok(Bytes::from(output.stdout))
        }
        .boxed()
    }
}
