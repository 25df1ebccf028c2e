use core::fmt;

use crate::sensor::{Axis, ForceUnit, TorqueUnit};

/// What the decoder reports back for a frame that carried something worth
/// surfacing. Calibration traffic updates internal state silently.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorEvent {
    /// An odd strain gauge frame completed a measurement cycle
    Reading(Reading),
    /// The sensor reported a watchdog reset through its self-test opcode
    WatchdogReset,
}

/// One resolved force/torque measurement: the calibration matrix applied to
/// a full set of six strain gauge counts.
///
/// The unit fields mirror whatever unit codes the sensor had announced by
/// the time the reading was computed and are `None` until then.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Force components, indexed Fx, Fy, Fz
    pub force: [f32; 3],
    /// Torque components, indexed Tx, Ty, Tz
    pub torque: [f32; 3],
    pub force_unit: Option<ForceUnit>,
    pub torque_unit: Option<TorqueUnit>,
}

impl Reading {
    /// Gets the component for a single axis
    pub fn component(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Fx | Axis::Fy | Axis::Fz => self.force[axis as usize],
            Axis::Tx | Axis::Ty | Axis::Tz => self.torque[axis as usize - 3],
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, axis) in Axis::ALL.into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }

            write!(f, "{}: {}", axis.label(), self.component(axis))?;

            let unit = if axis.is_force() {
                self.force_unit.map(ForceUnit::as_str)
            } else {
                self.torque_unit.map(TorqueUnit::as_str)
            };

            if let Some(unit) = unit {
                write!(f, " {unit}")?;
            }
        }

        Ok(())
    }
}

impl From<Reading> for SensorEvent {
    fn from(reading: Reading) -> Self {
        Self::Reading(reading)
    }
}

impl fmt::Display for SensorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reading(reading) => reading.fmt(f),
            Self::WatchdogReset => f.write_str("Watchdog Reset"),
        }
    }
}
