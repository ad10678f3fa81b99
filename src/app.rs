//! Wires the surface, preprocessor, classifier worker and display together.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::classify::{interpret, ClassLabels, Palette};
use crate::config::Config;
use crate::display::{DisplayState, CLASSIFY_FAILED, MODEL_LOAD_FAILED};
use crate::error::{Error, Result};
use crate::model::Classifier;
use crate::preprocess::Preprocessor;
use crate::surface::{normalize, InputEvent, StrokeSurface, SurfaceEvent};
use crate::types::Point;
use crate::worker::ClassificationWorker;

pub struct App {
    surface: StrokeSurface,
    surface_events: Receiver<SurfaceEvent>,
    preprocessor: Preprocessor,
    worker: Option<ClassificationWorker>,
    labels: ClassLabels,
    palette: Palette,
    display: DisplayState,
    origin: Point,
    /// Bumped on every clear; results for an older canvas are dropped.
    generation: u64,
    pending_generation: Option<u64>,
}

impl App {
    /// Build the app. A failed model load is shown to the user; drawing still
    /// works, classification then reports an error.
    pub fn new(config: &Config, model: Result<Arc<dyn Classifier>>, origin: Point) -> Self {
        let mut surface =
            StrokeSurface::new(config.canvas.width, config.canvas.height, config.stroke_style());
        let surface_events = surface.subscribe();
        let mut display = DisplayState::default();
        let mut labels = config.labels();

        let worker = match model {
            Ok(model) => {
                if let Some(names) = model.class_names() {
                    let from_model = ClassLabels::new(names.iter().cloned());
                    if from_model != labels {
                        info!(classes = ?names, "using class names from the model");
                    }
                    labels = from_model;
                }
                Some(ClassificationWorker::spawn(model))
            }
            Err(e) => {
                error!("Error loading model: {e}");
                display.show_error(MODEL_LOAD_FAILED);
                None
            }
        };

        Self {
            surface,
            surface_events,
            preprocessor: config.preprocessor(),
            worker,
            labels,
            palette: config.palette(),
            display,
            origin,
            generation: 0,
            pending_generation: None,
        }
    }

    pub fn surface(&self) -> &StrokeSurface {
        &self.surface
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    /// Route one device event to the surface.
    pub fn handle_input(&mut self, event: &InputEvent) {
        if let Some(input) = normalize(event, self.origin) {
            self.surface.apply(input);
        }
    }

    /// Wipe the canvas; the prediction display resets with it.
    pub fn clear(&mut self) {
        self.surface.clear();
        self.drain_surface_events();
    }

    /// Snapshot, preprocess and hand off to the worker.
    ///
    /// A request while one is already pending is ignored (logged). Failures
    /// end up in the status message, never as a panic.
    pub fn request_classification(&mut self) {
        match self.submit() {
            Ok(()) => {
                self.display.busy = true;
                self.pending_generation = Some(self.generation);
            }
            Err(Error::Busy) => warn!("classification already in progress, request ignored"),
            Err(e) => {
                error!("Classification error: {e}");
                self.display.show_error(CLASSIFY_FAILED);
            }
        }
    }

    fn submit(&mut self) -> Result<()> {
        let worker = self
            .worker
            .as_mut()
            .ok_or_else(|| Error::Classification("no model loaded".into()))?;
        if worker.is_busy() {
            return Err(Error::Busy);
        }
        let tensor = self.preprocessor.prepare(&self.surface.snapshot())?;
        debug!(shape = ?tensor.shape(), "classification dispatched");
        worker.submit(tensor)
    }

    /// Per-frame housekeeping: apply surface notifications, collect results.
    pub fn tick(&mut self) {
        self.drain_surface_events();

        let Some(outcome) = self.worker.as_mut().and_then(ClassificationWorker::poll) else {
            return;
        };
        self.display.busy = false;
        let generation = self.pending_generation.take();

        if generation != Some(self.generation) {
            debug!("canvas cleared while classifying, result dropped");
            return;
        }

        match outcome.and_then(|scores| interpret(&scores, &self.labels, &self.palette)) {
            Ok(prediction) => {
                info!(class = %prediction.class, scores = ?prediction.scores, "prediction");
                self.display.show_prediction(&prediction);
            }
            Err(e) => {
                error!("Classification error: {e}");
                self.display.show_error(CLASSIFY_FAILED);
            }
        }
    }

    fn drain_surface_events(&mut self) {
        while let Ok(event) = self.surface_events.try_recv() {
            match event {
                SurfaceEvent::Cleared => {
                    self.generation += 1;
                    self.display.reset();
                }
            }
        }
    }
}
