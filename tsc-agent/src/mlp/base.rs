use super::MlpQConfig;
use crate::{
    bootstrap_targets,
    estimator::argmax,
    util::{copy_vars, init_vars, track},
    TargetSync, UpdateParams, ValueEstimator,
};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::{linear, loss::mse, AdamW, Linear, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use log::info;
use rand::rngs::StdRng;
use std::path::Path;
use tsc_core::{replay_buffer::TransitionBatch, TscError};

/// Action-value function given by a multilayer perceptron with ReLU activations.
///
/// The network maps a feature vector to the values of all actions. Its parameters live
/// in a [`VarMap`], which is what target synchronisation and checkpoints operate on.
pub struct MlpQ {
    config: MlpQConfig,
    device: Device,
    varmap: VarMap,
    layers: Vec<Linear>,
    opt: AdamW,
    in_dim: usize,
    n_actions: usize,
}

impl MlpQ {
    /// Builds the network with parameters drawn from `rng`.
    pub fn build(
        config: &MlpQConfig,
        in_dim: usize,
        n_actions: usize,
        rng: &mut StdRng,
    ) -> Result<Self> {
        config.validate()?;
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let mut dims = vec![in_dim];
        dims.extend(config.units.iter().copied());
        dims.push(n_actions);
        let layers = dims
            .windows(2)
            .enumerate()
            .map(|(i, w)| linear(w[0], w[1], vb.pp(format!("ln{}", i))))
            .collect::<Result<Vec<_>, _>>()?;
        init_vars(&varmap, rng)?;

        let params = ParamsAdamW {
            lr: config.learning_rate,
            weight_decay: config.weight_decay,
            ..ParamsAdamW::default()
        };
        let opt = AdamW::new(varmap.all_vars(), params)?;

        Ok(Self {
            config: config.clone(),
            device,
            varmap,
            layers,
            opt,
            in_dim,
            n_actions,
        })
    }

    /// Parameters of the network.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    fn input(&self, features: &[&[f32]]) -> Result<Tensor> {
        let mut data = Vec::with_capacity(features.len() * self.in_dim);
        for f in features.iter() {
            if f.len() != self.in_dim {
                return Err(TscError::MalformedState(format!(
                    "feature vector of length {}, expected {}",
                    f.len(),
                    self.in_dim
                ))
                .into());
            }
            data.extend(f.iter().map(|v| v * self.config.input_scale));
        }
        Ok(Tensor::from_vec(data, (features.len(), self.in_dim), &self.device)?)
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let n_layers = self.layers.len();
        let mut xs = xs.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs)?;
            if i + 1 < n_layers {
                xs = xs.relu()?;
            }
        }
        Ok(xs)
    }

    fn forward_rows(&self, features: &[&[f32]]) -> Result<Vec<Vec<f32>>> {
        let rows = self.forward(&self.input(features)?)?.to_vec2::<f32>()?;
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(TscError::NonFinite("Q-network output".to_string()).into());
        }
        Ok(rows)
    }
}

impl ValueEstimator for MlpQ {
    fn n_actions(&self) -> usize {
        self.n_actions
    }

    fn predict_all(&self, features: &[f32]) -> Result<Vec<f32>> {
        self.forward_rows(&[features])?
            .pop()
            .ok_or_else(|| TscError::NonFinite("empty Q-network output".to_string()).into())
    }

    fn predict_best_batch(&self, features: &[&[f32]]) -> Result<Vec<(usize, f32)>> {
        if features.is_empty() {
            return Ok(vec![]);
        }
        self.forward_rows(features)?
            .iter()
            .map(|row| argmax(row))
            .collect()
    }

    fn update(
        &mut self,
        batch: &TransitionBatch,
        target: &Self,
        params: &UpdateParams,
    ) -> Result<f32> {
        let n = batch.len();
        let targets = bootstrap_targets(batch, target, params)?;
        let obs: Vec<&[f32]> = batch.iter().map(|t| t.obs()).collect();
        let act: Vec<u32> = batch.iter().map(|t| t.act() as u32).collect();

        let pred = {
            let act = Tensor::from_vec(act, (n, 1), &self.device)?;
            let q = self.forward(&self.input(&obs)?)?;
            q.gather(&act, 1)?.squeeze(1)?
        };
        let tgt = Tensor::from_vec(targets, n, &self.device)?;
        let loss = mse(&pred, &tgt)?;
        let loss_value = loss.to_scalar::<f32>()?;
        if !loss_value.is_finite() {
            return Err(TscError::NonFinite(format!("loss = {}", loss_value)).into());
        }

        self.opt.backward_step(&loss)?;
        Ok(loss_value)
    }

    fn sync_from(&mut self, online: &Self, sync: TargetSync) -> Result<()> {
        match sync {
            TargetSync::Hard => copy_vars(&self.varmap, &online.varmap),
            TargetSync::Soft { tau } => track(&self.varmap, &online.varmap, tau),
        }
    }

    /// Saves the parameters in safetensors format.
    fn save(&self, path: &Path) -> Result<()> {
        self.varmap.save(path)?;
        info!("Save Q-network to {:?}", path);
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        self.varmap.load(path)?;
        info!("Load Q-network from {:?}", path);
        Ok(())
    }
}
