use super::{create_linear_layers, mlp_forward, MlpConfig};
use crate::{model::SubModel1, Activation};
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{Linear, VarBuilder};

/// Multilayer perceptron.
///
/// Hidden layers use the activation of [`MlpConfig`]; the output layer is
/// linear unless `activation_out` is set.
pub struct Mlp {
    config: MlpConfig,
    device: Device,
    layers: Vec<Linear>,
}

impl SubModel1 for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        let xs = xs.to_device(&self.device)?;
        let final_act = match self.config.activation_out {
            false => Activation::None,
            true => self.config.activation,
        };
        mlp_forward(xs, &self.layers, &self.config.activation, &final_act)
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let mut units = config.units.clone();
        units.push(config.out_dim);
        let layers = create_linear_layers("mlp", vb, config.in_dim, &units)?;

        Ok(Self {
            config,
            device,
            layers,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    #[test]
    fn test_mlp_shapes() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mlp = Mlp::build(vb, MlpConfig::new(5, vec![16, 8], 3, false))?;
        let xs = Tensor::randn(0f32, 1f32, (4, 5), &Device::Cpu)?;

        assert_eq!(mlp.forward(&xs)?.dims(), [4, 3]);
        // 3 weights and 3 biases
        assert_eq!(varmap.all_vars().len(), 6);
        Ok(())
    }

    #[test]
    fn test_mlp_activation_out() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let config = MlpConfig::new(3, vec![8], 16, true).activation(Activation::Tanh);
        let mlp = Mlp::build(vb, config)?;
        let xs = (Tensor::randn(0f32, 1f32, (7, 3), &Device::Cpu)? * 100.0)?;
        let ys = mlp.forward(&xs)?.flatten_all()?.to_vec1::<f32>()?;

        assert!(ys.iter().all(|y| y.abs() <= 1.0));
        Ok(())
    }
}
