//! Utilities.
use anyhow::{Context, Result};
use candle_core::Tensor;
use candle_nn::VarMap;
use log::trace;
use waveft_core::record::{Record, RecordValue};

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> i64;

    /// Sets the  output dimension.
    fn set_out_dim(&mut self, v: i64);
}

/// Applies soft update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    trace!("track(), tau = {}", tau);
    let dest = dest
        .data()
        .lock()
        .map_err(|_| anyhow::anyhow!("parameter store is poisoned"))?;
    let src = src
        .data()
        .lock()
        .map_err(|_| anyhow::anyhow!("parameter store is poisoned"))?;

    for (k_dest, v_dest) in dest.iter() {
        let v_src = src
            .get(k_dest)
            .with_context(|| format!("variable {} is missing in the source", k_dest))?;
        let t_src = v_src.as_tensor().to_device(v_dest.device())?;
        let t_dest = match tau == 1.0 {
            true => t_src,
            false => ((tau * t_src)? + ((1.0 - tau) * v_dest.as_tensor())?)?,
        };
        v_dest.set(&t_dest)?;
    }

    Ok(())
}

/// Returns the standard deviation of all elements of a tensor.
pub fn std(t: &Tensor) -> Result<f32> {
    let v = t
        .broadcast_sub(&t.mean_all()?)?
        .sqr()?
        .mean_all()?
        .sqrt()?
        .to_dtype(candle_core::DType::F32)?
        .to_scalar::<f32>()?;
    Ok(v)
}

/// Returns the mean and standard deviation of the parameters.
///
/// Keys are `{name}_mean` and `{name}_std` for every variable in `varmap`.
pub fn param_stats(varmap: &VarMap) -> Result<Record> {
    let mut record = Record::empty();
    let data = varmap
        .data()
        .lock()
        .map_err(|_| anyhow::anyhow!("parameter store is poisoned"))?;

    for (k, v) in data.iter() {
        let m: f32 = v.mean_all()?.to_scalar()?;
        record.insert(format!("{}_mean", &k), RecordValue::Scalar(m));

        let s = std(v.as_tensor())?;
        record.insert(format!("{}_std", &k), RecordValue::Scalar(s));
    }

    Ok(record)
}

/// Copies a tensor to the host as a flat vector.
pub(crate) fn to_vec_f32(t: &Tensor) -> Result<Vec<f32>> {
    Ok(t
        .flatten_all()?
        .to_dtype(candle_core::DType::F32)?
        .to_vec1::<f32>()?)
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::Init;

    #[test]
    fn test_track() -> Result<()> {
        let tau = 0.7;
        let t_src = Tensor::from_slice(&[1.0f32, 2.0, 3.0], (3,), &Device::Cpu)?;
        let t_dest = Tensor::from_slice(&[4.0f32, 5.0, 6.0], (3,), &Device::Cpu)?;
        let t = ((tau * &t_src)? + ((1.0 - tau) * &t_dest)?)?;

        let vm_src = VarMap::new();
        vm_src.get((3,), "var1", Init::Const(0.0), DType::F32, &Device::Cpu)?;
        vm_src.data().lock().unwrap()["var1"].set(&t_src)?;
        let vm_dest = VarMap::new();
        vm_dest.get((3,), "var1", Init::Const(0.0), DType::F32, &Device::Cpu)?;
        vm_dest.data().lock().unwrap()["var1"].set(&t_dest)?;

        track(&vm_dest, &vm_src, tau)?;

        let t_ = vm_dest.data().lock().unwrap()["var1"].as_tensor().clone();
        assert!((t - t_)?.abs()?.sum(0)?.to_scalar::<f32>()? < 1e-6);
        Ok(())
    }

    #[test]
    fn test_track_missing_variable() -> Result<()> {
        let vm_src = VarMap::new();
        let vm_dest = VarMap::new();
        vm_dest.get((3,), "var1", Init::Const(0.0), DType::F32, &Device::Cpu)?;
        assert!(track(&vm_dest, &vm_src, 1.0).is_err());
        Ok(())
    }

    #[test]
    fn test_std() -> Result<()> {
        let t = Tensor::from_slice(&[1.0f32, 3.0, 1.0, 3.0], (2, 2), &Device::Cpu)?;
        assert!((std(&t)? - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_param_stats() -> Result<()> {
        let vm = VarMap::new();
        vm.get((4,), "w", Init::Const(0.5), DType::F32, &Device::Cpu)?;
        let record = param_stats(&vm)?;

        assert!((record.get_scalar("w_mean")? - 0.5).abs() < 1e-6);
        assert!(record.get_scalar("w_std")?.abs() < 1e-6);
        Ok(())
    }
}
