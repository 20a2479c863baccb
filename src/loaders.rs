use std::path::PathBuf;
use std::time::Duration;

use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            filename: filename.into(),
        }
    }

    pub fn load(&self) -> Result<PathBuf> {
        let hf_repo = open_repo(&self.repo)?;

        let max_retries = 3;
        let mut attempts = 0u32;

        for attempt in 0..max_retries {
            match hf_repo.get(self.filename.as_str()) {
                Ok(path) => return Ok(path),
                Err(e) => {
                    let error_msg = e.to_string();
                    attempts = attempt + 1;
                    if error_msg.contains("Lock acquisition failed") && attempt < max_retries - 1 {
                        let wait_time = Duration::from_millis(100 * (1 << attempt));
                        tracing::debug!(
                            repo = %self.repo,
                            file = %self.filename,
                            ?wait_time,
                            "hub cache locked, retrying"
                        );
                        std::thread::sleep(wait_time);
                        continue;
                    }
                    return Err(PipelineError::ModelUnavailable(format!(
                        "Failed to download '{}' from '{}': {}",
                        self.filename, self.repo, error_msg
                    )));
                }
            }
        }

        Err(PipelineError::ModelUnavailable(format!(
            "Download timed out for '{}' from '{}' after {} attempt(s)",
            self.filename, self.repo, attempts
        )))
    }
}

#[derive(Clone)]
pub struct TokenizerLoader {
    pub tokenizer_file_loader: HfLoader,
}

impl TokenizerLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        let tokenizer_file_loader = HfLoader::new(repo, filename);

        Self {
            tokenizer_file_loader,
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let tokenizer_file_path = self.tokenizer_file_loader.load()?;
        let path_str = tokenizer_file_path.display().to_string();

        let tokenizer = Tokenizer::from_file(&tokenizer_file_path).map_err(|e| {
            PipelineError::ModelUnavailable(format!(
                "Failed to load tokenizer from '{}': {}",
                path_str, e
            ))
        })?;

        Ok(tokenizer)
    }
}

/// Paths to the files needed to instantiate an encoder checkpoint.
#[derive(Debug, Clone)]
pub struct WeightFiles {
    pub config: PathBuf,
    pub weights: PathBuf,
}

#[derive(Clone)]
pub struct SafetensorsModelLoader {
    pub config_file_loader: HfLoader,
    pub repo: String,
}

impl SafetensorsModelLoader {
    pub fn new(model_repo: &str) -> Self {
        Self {
            config_file_loader: HfLoader::new(model_repo, "config.json"),
            repo: model_repo.into(),
        }
    }

    /// Fetches `config.json` and the weights, preferring `model.safetensors`
    /// over `pytorch_model.bin`.
    pub fn load(&self) -> Result<WeightFiles> {
        let config = self.config_file_loader.load()?;

        let weights = HfLoader::new(&self.repo, "model.safetensors")
            .load()
            .or_else(|safetensors| {
                HfLoader::new(&self.repo, "pytorch_model.bin")
                    .load()
                    .map_err(|pth| weights_unavailable(&self.repo, &safetensors, &pth))
            })?;

        Ok(WeightFiles { config, weights })
    }
}

fn weights_unavailable(repo: &str, safetensors: &PipelineError, pth: &PipelineError) -> PipelineError {
    PipelineError::ModelUnavailable(format!(
        "No usable weights in '{repo}': model.safetensors: {safetensors}; pytorch_model.bin: {pth}"
    ))
}

fn open_repo(repo_id: &str) -> Result<ApiRepo> {
    let api = ApiBuilder::new().with_progress(false).build().map_err(|e| {
        PipelineError::ModelUnavailable(format!("Failed to initialize HuggingFace API: {e}"))
    })?;
    Ok(api.repo(Repo::new(repo_id.to_string(), RepoType::Model)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_weights_report_both_files() {
        let safetensors = PipelineError::ModelUnavailable("safetensors 404".into());
        let pth = PipelineError::ModelUnavailable("bin 404".into());

        let err = weights_unavailable("owner/model", &safetensors, &pth);

        let PipelineError::ModelUnavailable(msg) = &err else {
            panic!("expected ModelUnavailable, got {err:?}");
        };
        assert!(msg.contains("owner/model"));
        assert!(msg.contains("model.safetensors: safetensors 404"));
        assert!(msg.contains("pytorch_model.bin: bin 404"));
    }
}
