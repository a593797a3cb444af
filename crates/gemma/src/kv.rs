//! Key/value cache plumbing for exports that take `past_key_values.*` inputs.

use ort::session::Session;
use ort::value::{DynTensor, Tensor, ValueType};
use trailguard_engine::EngineError;

const PAST_PREFIX: &str = "past_key_values";
const PRESENT_PREFIX: &str = "present";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Elem {
    F16,
    F32,
}

#[derive(Debug, Clone, PartialEq)]
struct Primer {
    elem: Elem,
    shape: Vec<i64>,
}

impl Primer {
    fn tensor(&self) -> trailguard_engine::Result<DynTensor> {
        let numel = self.shape.iter().product::<i64>().max(0) as usize;
        let tensor = match self.elem {
            Elem::F32 => Tensor::<f32>::from_array((self.shape.clone(), vec![0f32; numel]))
                .map_err(|e| EngineError::Generation(e.to_string()))?
                .upcast(),
            Elem::F16 => Tensor::<half::f16>::from_array((
                self.shape.clone(),
                vec![half::f16::ZERO; numel],
            ))
            .map_err(|e| EngineError::Generation(e.to_string()))?
            .upcast(),
        };
        Ok(tensor)
    }
}

/// Past inputs, their matching present outputs and how to seed them.
#[derive(Debug)]
pub(crate) struct KvLayout {
    pub past_inputs: Vec<String>,
    pub present_outputs: Vec<String>,
    primers: Vec<Primer>,
}

impl KvLayout {
    /// Inspect the session's inputs. `None` when the export has no cache inputs.
    pub fn detect(session: &Session) -> trailguard_engine::Result<Option<Self>> {
        let mut past_inputs = Vec::new();
        let mut present_outputs = Vec::new();
        let mut primers = Vec::new();
        for input in &session.inputs {
            if !input.name.starts_with(PAST_PREFIX) {
                continue;
            }
            let primer = primer_for(&input.input_type).ok_or_else(|| {
                EngineError::Load(format!(
                    "unsupported cache input {}: {:?}",
                    input.name, input.input_type
                ))
            })?;
            past_inputs.push(input.name.clone());
            present_outputs.push(input.name.replacen(PAST_PREFIX, PRESENT_PREFIX, 1));
            primers.push(primer);
        }
        if past_inputs.is_empty() {
            return Ok(None);
        }
        tracing::debug!(
            layers = past_inputs.len(),
            first_shape = ?primers.first().map(|p| &p.shape),
            "Primed key/value cache layout"
        );
        Ok(Some(Self {
            past_inputs,
            present_outputs,
            primers,
        }))
    }

    /// One zeroed timestep per cache input. Callers mask that position out.
    pub fn primed(&self) -> trailguard_engine::Result<Vec<DynTensor>> {
        self.primers.iter().map(Primer::tensor).collect()
    }
}

fn primer_for(value_type: &ValueType) -> Option<Primer> {
    let ValueType::Tensor {
        ty,
        shape,
        dimension_symbols,
    } = value_type
    else {
        return None;
    };
    let elem = match ty {
        ort::tensor::TensorElementType::Float16 => Elem::F16,
        ort::tensor::TensorElementType::Float32 => Elem::F32,
        _ => return None,
    };
    let dims: Vec<i64> = shape.iter().copied().collect();
    let symbols: &[String] = dimension_symbols.as_ref();
    Some(Primer {
        elem,
        shape: primed_shape(&dims, symbols),
    })
}

/// Index of the sequence axis: a symbol naming it, else the last dynamic axis.
fn sequence_axis(dims: &[i64], symbols: &[String]) -> usize {
    let named = symbols.iter().position(|s| {
        let s = s.to_lowercase();
        s.contains("past") || s.contains("seq")
    });
    named.unwrap_or_else(|| {
        dims.iter()
            .rposition(|d| *d < 0)
            .unwrap_or_else(|| dims.len().saturating_sub(1))
    })
}

/// Dynamic axes become 1. Zero-sized tensors cannot be built, so the
/// sequence axis also holds one slot that the attention mask hides.
fn primed_shape(dims: &[i64], symbols: &[String]) -> Vec<i64> {
    let seq = sequence_axis(dims, symbols);
    dims.iter()
        .enumerate()
        .map(|(i, d)| if i == seq || *d < 0 { 1 } else { *d })
        .collect()
}
