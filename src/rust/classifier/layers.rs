//! Building blocks of the recurrent classifier.
//!
//! Each stage owns its own variables and is applied by plain function
//! composition in [`super::RecurrentClassifier`].

use std::collections::HashMap;

use candle_core::{DType, Device, Tensor, Var};
use rand::rngs::StdRng;
use rand::Rng;

use super::error::ClassifierError;

/// Whether a forward pass regularizes. Training mode carries the random
/// source used to draw dropout masks.
pub enum ForwardMode<'a> {
    Inference,
    Training(&'a mut StdRng),
}

impl<'a> ForwardMode<'a> {
    fn rng(&mut self) -> Option<&mut StdRng> {
        match self {
            ForwardMode::Training(rng) => Some(&mut **rng),
            ForwardMode::Inference => None,
        }
    }

    pub fn is_training(&self) -> bool {
        matches!(self, ForwardMode::Training(_))
    }
}

/// The mutable half of the model: every variable the optimizer may update.
#[derive(Debug, Clone, Default)]
pub struct TrainableParameters {
    vars: Vec<(String, Var)>,
}

impl TrainableParameters {
    fn register(&mut self, name: String, var: &Var) {
        self.vars.push((name, var.clone()));
    }

    /// Variables handed to the optimizer. They share storage with the layers.
    pub fn all_vars(&self) -> Vec<Var> {
        self.vars.iter().map(|(_, var)| var.clone()).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.vars.iter().map(|(name, _)| name.as_str())
    }

    /// Snapshot of the current values, keyed by variable name.
    pub fn named_tensors(&self) -> HashMap<String, Tensor> {
        self.vars
            .iter()
            .map(|(name, var)| (name.clone(), var.as_tensor().clone()))
            .collect()
    }

    /// Overwrites every variable with the tensor of the same name.
    ///
    /// # Errors
    /// - `ModelError` if a variable is missing or its shape differs
    pub fn load(&self, tensors: &HashMap<String, Tensor>) -> Result<(), ClassifierError> {
        for (name, var) in &self.vars {
            let tensor = tensors
                .get(name)
                .ok_or_else(|| ClassifierError::ModelError(format!("Missing parameter '{}'", name)))?;
            if tensor.dims() != var.dims() {
                return Err(ClassifierError::ModelError(format!(
                    "Parameter '{}' has shape {:?}, expected {:?}",
                    name,
                    tensor.dims(),
                    var.dims()
                )));
            }
            var.set(&tensor.to_dtype(DType::F32)?.to_device(var.device())?)?;
        }
        Ok(())
    }

    /// Total number of scalar parameters.
    pub fn num_params(&self) -> usize {
        self.vars.iter().map(|(_, var)| var.elem_count()).sum()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

fn uniform_var(
    shape: &[usize],
    bound: f32,
    rng: &mut StdRng,
    device: &Device,
) -> Result<Var, ClassifierError> {
    let count: usize = shape.iter().product();
    let data: Vec<f32> = (0..count).map(|_| rng.gen_range(-bound..bound)).collect();
    let tensor = Tensor::from_vec(data, shape.to_vec(), device)?;
    Ok(Var::from_tensor(&tensor)?)
}

// Stable logistic function built from tanh so that the gradient stays finite.
fn sigmoid(xs: &Tensor) -> candle_core::Result<Tensor> {
    xs.affine(0.5, 0.0)?.tanh()?.affine(0.5, 0.5)
}

/// A left-to-right LSTM layer with gate order input, forget, cell, output.
#[derive(Debug, Clone)]
pub(crate) struct LstmLayer {
    w_ih: Var,
    w_hh: Var,
    bias: Var,
    hidden_size: usize,
    return_sequences: bool,
}

impl LstmLayer {
    pub(crate) fn new(
        name: &str,
        input_size: usize,
        hidden_size: usize,
        return_sequences: bool,
        rng: &mut StdRng,
        device: &Device,
        params: &mut TrainableParameters,
    ) -> Result<Self, ClassifierError> {
        let bound = 1.0 / (hidden_size as f32).sqrt();
        let w_ih = uniform_var(&[4 * hidden_size, input_size], bound, rng, device)?;
        let w_hh = uniform_var(&[4 * hidden_size, hidden_size], bound, rng, device)?;

        // Forget gate starts open.
        let mut bias = vec![0.0f32; 4 * hidden_size];
        bias[hidden_size..2 * hidden_size].fill(1.0);
        let bias = Var::from_tensor(&Tensor::from_vec(bias, 4 * hidden_size, device)?)?;

        params.register(format!("{}.weight_ih", name), &w_ih);
        params.register(format!("{}.weight_hh", name), &w_hh);
        params.register(format!("{}.bias", name), &bias);

        Ok(Self {
            w_ih,
            w_hh,
            bias,
            hidden_size,
            return_sequences,
        })
    }

    /// `(batch, steps, input)` to `(batch, steps, hidden)` when returning
    /// sequences, otherwise to the final state `(batch, hidden)`.
    pub(crate) fn forward(&self, xs: &Tensor) -> Result<Tensor, ClassifierError> {
        let (batch, steps, input_size) = xs.dims3()?;
        let w_ih_t = self.w_ih.as_tensor().t()?;
        let w_hh_t = self.w_hh.as_tensor().t()?;

        // Project every time step at once; only the recurrent term is sequential.
        let projected = xs
            .reshape((batch * steps, input_size))?
            .matmul(&w_ih_t)?
            .broadcast_add(self.bias.as_tensor())?
            .reshape((batch, steps, 4 * self.hidden_size))?;

        let mut h = Tensor::zeros((batch, self.hidden_size), DType::F32, xs.device())?;
        let mut c = h.clone();
        let mut outputs = Vec::with_capacity(if self.return_sequences { steps } else { 0 });
        for t in 0..steps {
            let gates = projected.narrow(1, t, 1)?.squeeze(1)?.add(&h.matmul(&w_hh_t)?)?;
            let chunks = gates.chunk(4, 1)?;
            let input_gate = sigmoid(&chunks[0])?;
            let forget_gate = sigmoid(&chunks[1])?;
            let candidate = chunks[2].tanh()?;
            let output_gate = sigmoid(&chunks[3])?;
            c = forget_gate.mul(&c)?.add(&input_gate.mul(&candidate)?)?;
            h = output_gate.mul(&c.tanh()?)?;
            if self.return_sequences {
                outputs.push(h.clone());
            }
        }

        if self.return_sequences {
            Ok(Tensor::stack(&outputs, 1)?)
        } else {
            Ok(h)
        }
    }
}

/// Inverted dropout: kept units are scaled by `1 / (1 - rate)`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Dropout {
    rate: f32,
}

impl Dropout {
    pub(crate) fn new(rate: f32) -> Self {
        Self { rate }
    }

    pub(crate) fn forward(&self, xs: &Tensor, mode: &mut ForwardMode<'_>) -> Result<Tensor, ClassifierError> {
        let rng = match mode.rng() {
            Some(rng) if self.rate > 0.0 => rng,
            _ => return Ok(xs.clone()),
        };
        let scale = 1.0 / (1.0 - self.rate);
        let mask: Vec<f32> = (0..xs.elem_count())
            .map(|_| if rng.gen::<f32>() < self.rate { 0.0 } else { scale })
            .collect();
        let mask = Tensor::from_vec(mask, xs.dims().to_vec(), xs.device())?;
        Ok(xs.mul(&mask)?)
    }
}

/// Affine map from the hidden state to class logits.
#[derive(Debug, Clone)]
pub(crate) struct Dense {
    weight: Var,
    bias: Var,
}

impl Dense {
    pub(crate) fn new(
        name: &str,
        input_size: usize,
        output_size: usize,
        rng: &mut StdRng,
        device: &Device,
        params: &mut TrainableParameters,
    ) -> Result<Self, ClassifierError> {
        let bound = (6.0 / (input_size + output_size) as f32).sqrt();
        let weight = uniform_var(&[output_size, input_size], bound, rng, device)?;
        let bias = Var::zeros(output_size, DType::F32, device)?;
        params.register(format!("{}.weight", name), &weight);
        params.register(format!("{}.bias", name), &bias);
        Ok(Self { weight, bias })
    }

    pub(crate) fn forward(&self, xs: &Tensor) -> Result<Tensor, ClassifierError> {
        Ok(xs
            .matmul(&self.weight.as_tensor().t()?)?
            .broadcast_add(self.bias.as_tensor())?)
    }
}
