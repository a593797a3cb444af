use crate::kv::KvLayout;
use crate::template::{chat_prompt, END_OF_TURN};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{DynTensor, DynTensorValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tokenizers::Tokenizer;
use trailguard_engine::{DecodingConfig, EngineError, LlmSession, Result, Sampler};

/// Prompts longer than this keep only their tail.
const MAX_PROMPT_TOKENS: usize = 2048;

fn gen_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Generation(e.to_string())
}

/// A loaded Gemma export with fixed decoding parameters.
#[derive(Debug)]
pub struct GemmaSession {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    input_names: Vec<String>,
    logits_output: String,
    kv: Option<KvLayout>,
    stop_ids: Vec<u32>,
    config: DecodingConfig,
    name: String,
}

impl GemmaSession {
    pub fn load(model_path: &Path, tokenizer_path: &Path, config: DecodingConfig) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| EngineError::Tokenizer(e.to_string()))?;

        let session = Session::builder()
            .map_err(|e| EngineError::Load(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| EngineError::Load(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| EngineError::Load(e.to_string()))?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let logits_output = session
            .outputs
            .iter()
            .map(|o| o.name.clone())
            .find(|n| n == "logits")
            .or_else(|| session.outputs.first().map(|o| o.name.clone()))
            .ok_or_else(|| EngineError::Load("model has no outputs".to_string()))?;
        let kv = KvLayout::detect(&session)?;

        let stop_ids: Vec<u32> = [END_OF_TURN, "<eos>"]
            .iter()
            .filter_map(|t| tokenizer.token_to_id(t))
            .collect();

        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "gemma".to_string());

        tracing::info!(
            model = %name,
            inputs = ?input_names,
            logits_output = %logits_output,
            kv_cache = kv.is_some(),
            max_tokens = config.max_tokens,
            "Gemma session loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            input_names,
            logits_output,
            kv,
            stop_ids,
            config,
            name,
        })
    }

    fn has_input(&self, name: &str) -> bool {
        self.input_names.iter().any(|n| n == name)
    }

    fn generate_ids(&self, prompt: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(chat_prompt(prompt), true)
            .map_err(|e| EngineError::Tokenizer(e.to_string()))?;
        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        if ids.len() > MAX_PROMPT_TOKENS {
            ids.drain(..ids.len() - MAX_PROMPT_TOKENS);
        }
        if ids.is_empty() {
            return Err(EngineError::Generation("prompt encoded to no tokens".to_string()));
        }

        // With a cache, slot 0 is the primed timestep and stays masked.
        let prefix = usize::from(self.kv.is_some());
        let mut past: Vec<DynTensor> = match &self.kv {
            Some(kv) => kv.primed()?,
            None => Vec::new(),
        };
        let mut sampler = Sampler::new(&self.config);
        let mut generated = Vec::new();

        for step in 0..self.config.max_tokens {
            let full_pass = step == 0 || self.kv.is_none();
            let len = ids.len();
            let (step_ids, positions): (Vec<i64>, Vec<i64>) = if full_pass {
                (ids.clone(), (prefix..prefix + len).map(|p| p as i64).collect())
            } else {
                (vec![ids[len - 1]], vec![(prefix + len - 1) as i64])
            };
            let mut mask = vec![0i64; prefix];
            mask.extend(std::iter::repeat_n(1i64, len));

            let mut inputs: Vec<(String, DynTensor)> = Vec::new();
            inputs.push((
                "input_ids".to_string(),
                Tensor::<i64>::from_array(([1usize, step_ids.len()], step_ids))
                    .map_err(gen_err)?
                    .upcast(),
            ));
            if self.has_input("attention_mask") {
                inputs.push((
                    "attention_mask".to_string(),
                    Tensor::<i64>::from_array(([1usize, mask.len()], mask))
                        .map_err(gen_err)?
                        .upcast(),
                ));
            }
            if self.has_input("position_ids") {
                inputs.push((
                    "position_ids".to_string(),
                    Tensor::<i64>::from_array(([1usize, positions.len()], positions))
                        .map_err(gen_err)?
                        .upcast(),
                ));
            }
            if let Some(kv) = &self.kv {
                inputs.extend(kv.past_inputs.iter().cloned().zip(std::mem::take(&mut past)));
            }

            let logits = {
                let mut session = self
                    .session
                    .lock()
                    .map_err(|_| gen_err("session lock poisoned"))?;
                let mut outputs = session.run(inputs).map_err(gen_err)?;
                let value: DynValue = outputs
                    .remove(self.logits_output.as_str())
                    .ok_or_else(|| gen_err("missing logits output"))?;
                let array = value.try_extract_array::<f32>().map_err(gen_err)?;
                let shape = array.shape().to_vec();
                let flat = array
                    .as_slice()
                    .ok_or_else(|| gen_err("logits are not contiguous"))?;
                let row = last_row(flat, &shape)?.to_vec();

                if let Some(kv) = &self.kv {
                    for name in &kv.present_outputs {
                        let value: DynValue = outputs
                            .remove(name.as_str())
                            .ok_or_else(|| gen_err(format!("missing output {name}")))?;
                        past.push(value.downcast::<DynTensorValueType>().map_err(gen_err)?);
                    }
                }
                row
            };

            let Some(next) = sampler.sample(&logits) else {
                tracing::warn!(step, "No finite logits; stopping generation");
                break;
            };
            if self.stop_ids.contains(&next) {
                break;
            }
            generated.push(next);
            ids.push(next as i64);
        }

        Ok(generated)
    }
}

/// Logits for the final position of a `[batch, seq, vocab]` or `[seq, vocab]` output.
fn last_row<'a>(flat: &'a [f32], shape: &[usize]) -> Result<&'a [f32]> {
    let vocab = match shape.last() {
        Some(v) if *v > 0 && shape.len() >= 2 => *v,
        _ => return Err(gen_err(format!("unexpected logits shape {shape:?}"))),
    };
    if flat.len() < vocab {
        return Err(gen_err("logits shorter than vocabulary"));
    }
    Ok(&flat[flat.len() - vocab..])
}

impl LlmSession for GemmaSession {
    fn generate(&self, prompt: &str) -> Result<String> {
        let started = std::time::Instant::now();
        let ids = self.generate_ids(prompt)?;
        let text = self
            .tokenizer
            .decode(&ids, true)
            .map_err(|e| EngineError::Tokenizer(e.to_string()))?;
        tracing::debug!(
            tokens = ids.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Gemma generation finished"
        );
        Ok(text.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
