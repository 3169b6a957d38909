// crates/spot_interop/src/host_events.rs

use spot_shared::host_event;

use crate::event_source::{RawEvent, ReadStringEvent};
use crate::host::Host;
use crate::transform::{CStrRef, NoOp};

pub type IdleEvent = RawEvent;
pub type ApplicationClosingEvent = RawEvent;
pub type ImageDocChangedEvent = RawEvent;
/// Argument is the camera name.
pub type CameraInitializedEvent = ReadStringEvent;

/// The standard host events, each bound the first time it is asked for.
///
/// Sources live as long as this context; dropping it unbinds whatever was bound.
#[derive(Debug)]
pub struct HostEvents {
    host: Host,
    idle: Option<IdleEvent>,
    application_closing: Option<ApplicationClosingEvent>,
    image_doc_changed: Option<ImageDocChangedEvent>,
    camera_initialized: Option<CameraInitializedEvent>,
}

impl HostEvents {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            idle: None,
            application_closing: None,
            image_doc_changed: None,
            camera_initialized: None,
        }
    }

    /// Raised whenever the host's message loop goes idle.
    pub fn idle(&mut self) -> &IdleEvent {
        let host = self.host;
        self.idle
            .get_or_insert_with(|| RawEvent::new(host, host_event::IDLE, NoOp))
    }

    pub fn application_closing(&mut self) -> &ApplicationClosingEvent {
        let host = self.host;
        self.application_closing
            .get_or_insert_with(|| RawEvent::new(host, host_event::APPLICATION_CLOSING, NoOp))
    }

    pub fn image_doc_changed(&mut self) -> &ImageDocChangedEvent {
        let host = self.host;
        self.image_doc_changed
            .get_or_insert_with(|| RawEvent::new(host, host_event::IMAGE_DOC_CHANGED, NoOp))
    }

    pub fn camera_initialized(&mut self) -> &CameraInitializedEvent {
        let host = self.host;
        self.camera_initialized.get_or_insert_with(|| {
            ReadStringEvent::new(host, host_event::CAMERA_INITIALIZED, CStrRef)
        })
    }

    pub fn existing_idle(&self) -> Option<&IdleEvent> {
        self.idle.as_ref()
    }

    pub fn existing_application_closing(&self) -> Option<&ApplicationClosingEvent> {
        self.application_closing.as_ref()
    }

    pub fn existing_image_doc_changed(&self) -> Option<&ImageDocChangedEvent> {
        self.image_doc_changed.as_ref()
    }

    pub fn existing_camera_initialized(&self) -> Option<&CameraInitializedEvent> {
        self.camera_initialized.as_ref()
    }
}
