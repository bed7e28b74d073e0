use crate::layers::Target;
use crate::net::error::SpecError;
use crate::net::net::Net;
use crate::net::spec;
use crate::session::data::SessionData;
use crate::session::stats::{LossWindow, TickStats};
use crate::trainer::trainer::Trainer;
use crate::vol::volume::{Shape, Volume};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

const LOSS_WINDOW: usize = 100;

/// Runtime pairing of a Net, a Trainer and a dataset, behind the façade
/// external callers use: configure with [`make_layers`](Session::make_layers),
/// infer with [`predict`](Session::predict), and train either one
/// [`tick`](Session::tick) at a time or on the background worker thread via
/// [`start_training`](Session::start_training).
///
/// A single mutex guards the Net and Trainer: structural swaps, worker ticks
/// and predict calls all take it, so no pass is ever torn. Stopping is
/// cooperative; the worker polls the flag once per full tick.
pub struct Session {
    inner: Arc<Mutex<Inner>>,
    training: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

struct Inner {
    net: Option<Net>,
    trainer: Option<Trainer>,
    data: SessionData,
    cursor: usize,
    step_count: u64,
    loss_window: LossWindow,
    progress_tx: Option<mpsc::Sender<TickStats>>,
}

impl Inner {
    /// One training step: draw the next sample, forward, backward, and let
    /// the trainer step at batch boundaries. Returns `None` when the session
    /// is unconfigured, the dataset is not ready, or the dataset does not
    /// match the current net's input size.
    fn tick(&mut self) -> Option<TickStats> {
        let net = self.net.as_mut()?;
        let trainer = self.trainer.as_mut()?;
        if !self.data.is_ready() {
            return None;
        }
        // dataset loaded for a different architecture; treat like not-ready
        // so façade misuse never panics the worker thread
        if self.data.input_dim() != net.in_shape().len() {
            return None;
        }

        let i = self.cursor % self.data.count();
        self.cursor = (i + 1) % self.data.count();

        let x = Volume::from_weights(net.in_shape(), self.data.input(i).to_vec());
        let label = self.data.label(i);
        let step = if net.is_classifier() {
            trainer.train(net, &x, Target::Class(label as usize))
        } else {
            trainer.train(net, &x, Target::Scalar(label))
        };

        self.step_count += 1;
        self.loss_window.push(step.loss);
        let stats = TickStats {
            step: self.step_count,
            loss: step.loss,
            loss_average: self.loss_window.average(),
            ratio_clipped: step.ratio_clipped,
        };
        if let Some(tx) = &self.progress_tx {
            if tx.send(stats).is_err() {
                // receiver went away; stop emitting
                self.progress_tx = None;
            }
        }
        Some(stats)
    }
}

impl Session {
    pub fn new() -> Session {
        Session {
            inner: Arc::new(Mutex::new(Inner {
                net: None,
                trainer: None,
                data: SessionData::new(),
                cursor: 0,
                step_count: 0,
                loss_window: LossWindow::new(LOSS_WINDOW),
                progress_tx: None,
            })),
            training: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Builds a fresh Net and Trainer from a layer-spec JSON document and
    /// swaps them in atomically. On any spec error the previous Net, Trainer
    /// and counters stay untouched.
    pub fn make_layers(&mut self, json: &str) -> Result<(), SpecError> {
        let entries = spec::parse(json)?;
        let (net, trainer) = spec::build(&entries)?;
        let mut inner = self.inner.lock().unwrap();
        inner.net = Some(net);
        inner.trainer = Some(trainer);
        inner.cursor = 0;
        inner.step_count = 0;
        inner.loss_window.clear();
        Ok(())
    }

    /// Replaces the trainer, dropping its accumulator state so nothing stale
    /// carries over to the current net.
    pub fn attach_trainer(&mut self, mut trainer: Trainer) {
        trainer.reset();
        self.inner.lock().unwrap().trainer = Some(trainer);
    }

    /// Inference only: forward with training disabled. Touches no trained
    /// parameter or accumulator state, so consecutive calls with the same
    /// input return identical output.
    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>, SpecError> {
        let mut inner = self.inner.lock().unwrap();
        let net = inner.net.as_mut().ok_or(SpecError::NotConfigured)?;
        let want = net.in_shape().len();
        if input.len() != want {
            return Err(SpecError::InputSizeMismatch {
                got: input.len(),
                want,
            });
        }
        let x = Volume::from_weights(net.in_shape(), input.to_vec());
        let out = net.forward(&x, false);
        Ok(out.w.clone())
    }

    /// Declared shape of every activation stage of the current net.
    pub fn shape_chain(&self) -> Option<Vec<Shape>> {
        self.inner.lock().unwrap().net.as_ref().map(Net::shape_chain)
    }

    /// Runs one training step on the caller's thread.
    pub fn tick(&self) -> Option<TickStats> {
        self.inner.lock().unwrap().tick()
    }

    /// Spawns the background training worker. No-op when already training.
    pub fn start_training(&mut self) {
        if self.worker.is_some() {
            return;
        }
        self.training.store(true, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let flag = Arc::clone(&self.training);
        self.worker = Some(std::thread::spawn(move || {
            while flag.load(Ordering::Relaxed) {
                let ticked = inner.lock().unwrap().tick().is_some();
                if !ticked {
                    // unconfigured or no data yet; back off instead of spinning
                    std::thread::sleep(Duration::from_millis(5));
                }
            }
        }));
    }

    /// Signals the worker to stop and waits for the tick in progress to
    /// finish.
    pub fn stop_training(&mut self) {
        self.training.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    pub fn is_training(&self) -> bool {
        self.worker.is_some()
    }

    pub fn loss_average(&self) -> f64 {
        self.inner.lock().unwrap().loss_window.average()
    }

    pub fn step_count(&self) -> u64 {
        self.inner.lock().unwrap().step_count
    }

    /// Registers a progress channel; the training loop sends one `TickStats`
    /// per step until the receiver is dropped.
    pub fn subscribe(&mut self) -> mpsc::Receiver<TickStats> {
        let (tx, rx) = mpsc::channel();
        self.inner.lock().unwrap().progress_tx = Some(tx);
        rx
    }

    /// Discards any previous dataset and allocates storage for `count`
    /// samples. Training must be stopped first.
    pub fn begin_data(&mut self, input_dim: usize, count: usize, label_count: usize) {
        assert!(!self.is_training(), "stop training before replacing data");
        let mut inner = self.inner.lock().unwrap();
        inner.data.begin_data(input_dim, count, label_count);
        inner.cursor = 0;
    }

    pub fn set_data(&mut self, i: usize, dim: usize, val: f64) {
        assert!(!self.is_training(), "stop training before replacing data");
        self.inner.lock().unwrap().data.set_data(i, dim, val);
    }

    pub fn set_label(&mut self, i: usize, val: f64) {
        assert!(!self.is_training(), "stop training before replacing data");
        self.inner.lock().unwrap().data.set_label(i, val);
    }

    pub fn end_data(&mut self) {
        assert!(!self.is_training(), "stop training before replacing data");
        self.inner.lock().unwrap().data.end_data();
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_training();
    }
}
