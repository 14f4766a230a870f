use std::collections::HashMap;
use std::sync::Mutex;
use vigil_common::{Event, Status};

/// Filter modes, selected by the `emit.filter_mode` config value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// 0: every event emits.
    Everything,
    /// 1: emit only on status change; a first observation emits unless OK.
    StatusChanges,
    /// 2: emit every non-OK event; OK only on the transition into it.
    NonOkWithRecovery,
}

impl TryFrom<u8> for FilterMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FilterMode::Everything),
            1 => Ok(FilterMode::StatusChanges),
            2 => Ok(FilterMode::NonOkWithRecovery),
            other => Err(format!("unknown filter mode: {other}")),
        }
    }
}

/// De-duplicates consecutive events per identifier.
///
/// All modes share the same `last_status` memory, so the mode can be
/// changed across restarts without changing what a transition means.
pub struct EventFilter {
    mode: FilterMode,
    last_status: Mutex<HashMap<String, Status>>,
}

impl EventFilter {
    pub fn new(mode: FilterMode) -> Self {
        EventFilter {
            mode,
            last_status: Mutex::new(HashMap::new()),
        }
    }

    pub fn should_emit(&self, event: &Event) -> bool {
        if self.mode == FilterMode::Everything {
            return true;
        }

        let mut last_status = self.last_status.lock().unwrap_or_else(|p| p.into_inner());
        let previous = last_status.insert(event.identifier.clone(), event.status);

        match previous {
            // first observation: anything but OK is news
            None => event.status != Status::Ok,
            Some(previous) if previous != event.status => true,
            // repeated status: mode 2 keeps firing while not OK
            Some(_) => self.mode == FilterMode::NonOkWithRecovery && event.status != Status::Ok,
        }
    }
}
