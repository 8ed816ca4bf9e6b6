//! Which services run on a given date.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::warn;

use super::records::{Calendar, CalendarException, ExceptionType};
use crate::domain::DataQualityWarning;

/// Services active on one date, plus whatever was wrong with the inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveServices {
    services: HashSet<String>,
    warnings: Vec<DataQualityWarning>,
}

impl ActiveServices {
    pub fn contains(&self, service_id: &str) -> bool {
        self.services.contains(service_id)
    }

    pub fn services(&self) -> &HashSet<String> {
        &self.services
    }

    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Resolve the set of services running on `date`.
///
/// Calendar rules are applied first, then the exceptions for `date`: an
/// `Added` exception activates the service whatever its calendar says, a
/// `Removed` one deactivates it. When a service has several exceptions for
/// the same date, the last one wins.
pub fn active_services(
    date: NaiveDate,
    calendars: &[Calendar],
    exceptions: &[CalendarException],
) -> ActiveServices {
    let mut services: HashSet<String> = calendars
        .iter()
        .filter(|c| c.is_active_on(date))
        .map(|c| c.service_id.clone())
        .collect();

    let mut warnings = Vec::new();
    let mut overrides: HashMap<&str, bool> = HashMap::new();

    for exception in exceptions.iter().filter(|e| e.date == date) {
        let active = match exception.exception_type {
            ExceptionType::Added => true,
            ExceptionType::Removed => false,
            ExceptionType::Unknown(value) => {
                warn!(
                    service_id = %exception.service_id,
                    %date,
                    value,
                    "Ignoring calendar exception with unknown type"
                );
                warnings.push(DataQualityWarning::UnknownExceptionType {
                    service_id: exception.service_id.clone(),
                    date,
                    value,
                });
                continue;
            }
        };

        if overrides
            .insert(exception.service_id.as_str(), active)
            .is_some()
        {
            warn!(
                service_id = %exception.service_id,
                %date,
                "Multiple calendar exceptions for one date, applying the last"
            );
            warnings.push(DataQualityWarning::DuplicateException {
                service_id: exception.service_id.clone(),
                date,
            });
        }
    }

    for (service_id, active) in overrides {
        if active {
            services.insert(service_id.to_string());
        } else {
            services.remove(service_id);
        }
    }

    ActiveServices { services, warnings }
}
