use crate::controller::GardenController;
use crate::jobs::{Completion, Job};
use crate::snapshot::GardenSnapshot;
use audio::AudioOutput;
use garden_core::{AssetSource, Decoder, Error, GardenCommand, GardenEvent};
use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Drives a [`GardenController`] from the front-end's commands and from
/// finished background jobs.
pub struct GardenHandler<O: AudioOutput> {
    /// The garden state
    controller: GardenController<O>,
    assets: Arc<dyn AssetSource>,
    decoder: Arc<dyn Decoder>,
    /// Channel for receiving commands from the UI
    command_rx: mpsc::Receiver<GardenCommand>,
    /// Completions of spawned jobs
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    /// Channel for sending garden events to the UI
    event_tx: mpsc::Sender<GardenEvent>,
    snapshot_tx: watch::Sender<GardenSnapshot>,
}

impl<O: AudioOutput> GardenHandler<O> {
    pub fn new(
        controller: GardenController<O>,
        assets: Arc<dyn AssetSource>,
        decoder: Arc<dyn Decoder>,
        command_rx: mpsc::Receiver<GardenCommand>,
        event_tx: mpsc::Sender<GardenEvent>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(64);
        let (snapshot_tx, _) = watch::channel(controller.snapshot());
        Self {
            controller,
            assets,
            decoder,
            command_rx,
            completion_tx,
            completion_rx,
            event_tx,
            snapshot_tx,
        }
    }

    /// Receiver of the view published after every change.
    pub fn subscribe(&self) -> watch::Receiver<GardenSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn controller(&self) -> &GardenController<O> {
        &self.controller
    }

    /// Run the handler until shutdown or until the command channel closes.
    /// Every voice is released on the way out.
    pub async fn run(&mut self) -> Result<(), Error> {
        self.dispatch_jobs();
        self.publish().await;

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(GardenCommand::Shutdown) => {
                        info!("Received shutdown command, exiting handler");
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("Command channel closed, exiting handler");
                        break;
                    }
                },

                Some(completion) = self.completion_rx.recv() => {
                    self.controller.complete(completion);
                }
            }

            self.dispatch_jobs();
            self.publish().await;
        }

        self.controller.shutdown();
        self.publish().await;
        Ok(())
    }

    fn handle_command(&mut self, command: GardenCommand) {
        match command {
            GardenCommand::Key(input) => self.controller.handle_key(input),
            GardenCommand::Perform(action) => self.controller.perform(action),
            GardenCommand::Upload { name, payload } => self.controller.upload(name, payload),
            GardenCommand::IngestManifest(locators) => self.controller.ingest_manifest(locators),
            GardenCommand::Shutdown => {
                // Handled in run before we reach here
            }
        }
    }

    /// Spawns a task per queued job; each reports back on the completion
    /// channel.
    fn dispatch_jobs(&mut self) {
        for job in self.controller.take_jobs() {
            self.spawn(job);
        }
    }

    fn spawn(&self, job: Job) {
        let assets = Arc::clone(&self.assets);
        let decoder = Arc::clone(&self.decoder);
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let completion = job.run(assets.as_ref(), decoder.as_ref()).await;
            if completion_tx.send(completion).await.is_err() {
                debug!("Handler gone, dropping job result");
            }
        });
    }

    /// Publishes a fresh snapshot, then forwards pending events.
    ///
    /// Every state change raises at least one event, so an empty batch
    /// means the last snapshot is still current.
    async fn publish(&mut self) {
        let events = self.controller.drain_events();
        if events.is_empty() {
            return;
        }
        self.snapshot_tx.send_replace(self.controller.snapshot());
        for event in events {
            if let Err(e) = self.event_tx.send(event).await {
                error!("Failed to send garden event: {}", e);
                break;
            }
        }
    }
}
