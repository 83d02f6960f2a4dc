use candle_core::{DType, Device, Tensor};
use candle_nn::{Init, Linear, Module, Optimizer, VarBuilder, VarMap};
use candle_optimisers::adam::{Adam, ParamsAdam};

use crate::{error::Result, state::AggregateState};

/// Layer widths of the utility network, input first.
pub const TOPOLOGY: [usize; 4] = [AggregateState::DIM, 64, 32, 1];

/// Scalar utility approximator over the aggregate world state.
///
/// `2 -> 64 -> 32 -> 1`, with a ReLU after the second layer only. Owns its
/// Adam optimiser like the rest of its parameters.
pub struct UtilityNetwork {
    pub layers: Vec<Linear>,
    pub var_map: VarMap,
    pub optimiser: Adam,
    device: Device,
}

/// Xavier-uniform weights, fan-in scaled uniform biases.
fn xavier_linear(fan_in: usize, fan_out: usize, vb: VarBuilder) -> Result<Linear> {
    let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
    let weight = vb.get_with_hints(
        (fan_out, fan_in),
        "weight",
        Init::Uniform {
            lo: -bound,
            up: bound,
        },
    )?;
    let bias_bound = 1.0 / (fan_in as f64).sqrt();
    let bias = vb.get_with_hints(
        fan_out,
        "bias",
        Init::Uniform {
            lo: -bias_bound,
            up: bias_bound,
        },
    )?;
    Ok(Linear::new(weight, Some(bias)))
}

impl UtilityNetwork {
    pub fn new(learning_rate: f64, device: &Device) -> Result<Self> {
        let vm = VarMap::new();
        let vb = VarBuilder::from_varmap(&vm, DType::F32, device);
        let mut layers: Vec<Linear> = Vec::with_capacity(TOPOLOGY.len() - 1);

        for i in 0..(TOPOLOGY.len() - 1) {
            layers.push(xavier_linear(TOPOLOGY[i], TOPOLOGY[i + 1], vb.pp(i))?);
        }

        let adam = Adam::new(
            vm.all_vars(),
            ParamsAdam {
                lr: learning_rate,
                ..Default::default()
            },
        )?;

        Ok(Self {
            layers,
            var_map: vm,
            optimiser: adam,
            device: device.clone(),
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Builds an `(N, 2)` input tensor from aggregate states.
    pub fn input_tensor(&self, states: &[AggregateState]) -> Result<Tensor> {
        let flat: Vec<f32> = states.iter().flat_map(|s| s.to_array()).collect();
        Ok(Tensor::from_vec(
            flat,
            (states.len(), AggregateState::DIM),
            &self.device,
        )?)
    }

    /// Batched forward pass, `(N, 2) -> (N, 1)`.
    pub fn output(&self, inputs: &Tensor) -> Result<Tensor> {
        let x = self.layers[0].forward(inputs)?;
        let x = self.layers[1].forward(&x)?.relu()?;
        Ok(self.layers[2].forward(&x)?)
    }

    /// Utility of a single state.
    pub fn evaluate(&self, state: AggregateState) -> Result<f32> {
        let input = self.input_tensor(&[state])?;
        let value = self.output(&input)?.flatten_all()?.to_vec1::<f32>()?;
        Ok(value[0])
    }

    /// Utility of every state in `states`, in order.
    pub fn evaluate_batch(&self, states: &[AggregateState]) -> Result<Vec<f32>> {
        let input = self.input_tensor(states)?;
        Ok(self.output(&input)?.flatten_all()?.to_vec1::<f32>()?)
    }
}
