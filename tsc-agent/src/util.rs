//! Utilities on candle variables.
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::VarMap;
use log::trace;
use rand::{rngs::StdRng, Rng};
use tsc_core::TscError;

fn lock_err<E: std::fmt::Display>(e: E) -> TscError {
    TscError::LockPoisoned(format!("varmap: {}", e))
}

/// Apply soft update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    trace!("track, tau = {}", tau);
    let dest = dest.data().lock().map_err(lock_err)?;
    let src = src.data().lock().map_err(lock_err)?;

    for (k_dest, v_dest) in dest.iter() {
        let v_src = src
            .get(k_dest)
            .ok_or_else(|| TscError::InvalidConfig(format!("variable {} is missing", k_dest)))?;
        let t_src = v_src.as_tensor().affine(tau, 0.0)?;
        let t_dest = v_dest.as_tensor().affine(1.0 - tau, 0.0)?;
        v_dest.set(&t_src.add(&t_dest)?)?;
    }

    Ok(())
}

/// Copies the values of the variables of `src` into `dest`.
pub fn copy_vars(dest: &VarMap, src: &VarMap) -> Result<()> {
    let dest = dest.data().lock().map_err(lock_err)?;
    let src = src.data().lock().map_err(lock_err)?;

    for (k_dest, v_dest) in dest.iter() {
        let v_src = src
            .get(k_dest)
            .ok_or_else(|| TscError::InvalidConfig(format!("variable {} is missing", k_dest)))?;
        v_dest.set(v_src.as_tensor())?;
    }

    Ok(())
}

/// Re-initialises the variables from a seeded generator.
///
/// Matrices of shape `(out, in)` are drawn uniformly from `±1/sqrt(in)`, vectors are
/// set to zero. Variables are visited in name order, so equal seeds give equal
/// parameters.
pub fn init_vars(varmap: &VarMap, rng: &mut StdRng) -> Result<()> {
    let data = varmap.data().lock().map_err(lock_err)?;
    let mut names: Vec<&String> = data.keys().collect();
    names.sort();

    for name in names {
        let var = &data[name];
        let t = var.as_tensor();
        let values: Vec<f32> = match t.dims() {
            [_, fan_in] => {
                let bound = 1.0 / (*fan_in as f32).sqrt();
                (0..t.elem_count())
                    .map(|_| rng.gen_range(-bound..bound))
                    .collect()
            }
            _ => vec![0.0; t.elem_count()],
        };
        let init = Tensor::from_vec(values, t.shape().clone(), t.device())?;
        var.set(&init)?;
    }

    Ok(())
}
