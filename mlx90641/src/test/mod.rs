
pub(crate) use recording_logger::RecordingLogger;
pub(crate) use scripted_transport::{Operation, ScriptedError, ScriptedTransport};
