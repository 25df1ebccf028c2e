use core::{fmt, num::NonZeroU32};

use alloc::vec::Vec;
use num_enum::TryFromPrimitive;

use crate::{
    codec::{
        f32_from_hex_pairs, u16_from_hex_pairs, u32_from_hex_pairs, u8_from_dec_digits,
        u8_from_hex_nibbles,
    },
    event::{Reading, SensorEvent},
    frame::LogFrame,
};

/// Id prefix carried by every response the device family emits out of the
/// box: the node address, with the opcode in the remaining character.
pub const DEFAULT_ID_PREFIX: [u8; 2] = *b"7F";

/// The response kind selector: the last character of a response id.
///
/// Characters outside this set are reserved or belong to other device
/// families and get ignored by the dispatcher rather than treated as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// A 2-byte status code followed by the even strain gauges sg0, sg2, sg4
    SgDataEven = b'0',
    /// The odd strain gauges sg1, sg3, sg5; completes a measurement cycle
    SgDataOdd = b'1',
    /// Axis selector (1 byte) or matrix coefficients for sg0 and sg1 (8 bytes)
    MatrixSg01 = b'2',
    /// Matrix coefficients for sg2 and sg3
    MatrixSg23 = b'3',
    /// Matrix coefficients for sg4 and sg5
    MatrixSg45 = b'4',
    /// Self-test notice; a zero byte reports a watchdog reset
    Watchdog = b'6',
    /// Counts-per-force and counts-per-torque scale factors
    CountsPerUnit = b'7',
    /// Force and torque unit codes
    UnitCodes = b'8',
}

/// One of the six measurement axes, in calibration matrix row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[num_enum(error_type(name = DecodeError, constructor = DecodeError::InvalidAxis))]
#[repr(u8)]
pub enum Axis {
    Fx = 0,
    Fy = 1,
    Fz = 2,
    Tx = 3,
    Ty = 4,
    Tz = 5,
}

impl Axis {
    pub const ALL: [Self; 6] = [Self::Fx, Self::Fy, Self::Fz, Self::Tx, Self::Ty, Self::Tz];

    /// Returns whether this axis is one of the three force components
    pub fn is_force(self) -> bool {
        matches!(self, Self::Fx | Self::Fy | Self::Fz)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fx => "Fx",
            Self::Fy => "Fy",
            Self::Fz => "Fz",
            Self::Tx => "Tx",
            Self::Ty => "Ty",
            Self::Tz => "Tz",
        }
    }
}

/// Force unit codes announced by the unit-codes response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[num_enum(error_type(name = DecodeError, constructor = DecodeError::InvalidForceUnit))]
#[repr(u8)]
pub enum ForceUnit {
    PoundForce = 1,
    Newton = 2,
    KilopoundForce = 3,
    Kilonewton = 4,
    KilogramForce = 5,
    GramForce = 6,
}

impl ForceUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PoundForce => "lbf",
            Self::Newton => "N",
            Self::KilopoundForce => "Klbf",
            Self::Kilonewton => "kN",
            Self::KilogramForce => "kgf",
            Self::GramForce => "gf",
        }
    }
}

impl fmt::Display for ForceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Torque unit codes announced by the unit-codes response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[num_enum(error_type(name = DecodeError, constructor = DecodeError::InvalidTorqueUnit))]
#[repr(u8)]
pub enum TorqueUnit {
    PoundForceInch = 1,
    PoundForceFoot = 2,
    NewtonMeter = 3,
    NewtonMillimeter = 4,
    KilogramForceCentimeter = 5,
    KilonewtonMeter = 6,
}

impl TorqueUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PoundForceInch => "lbf-in",
            Self::PoundForceFoot => "lbf-ft",
            Self::NewtonMeter => "N-m",
            Self::NewtonMillimeter => "N-mm",
            Self::KilogramForceCentimeter => "kgf-cm",
            Self::KilonewtonMeter => "kN-m",
        }
    }
}

impl fmt::Display for TorqueUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Various errors which can arise while decoding a response frame's payload.
///
/// Handlers decode every field they need before assigning any of them, so a
/// frame that fails with one of these leaves the accumulated state exactly
/// as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /* Payload text */
    #[error("Tried to decode a hex digit but it was out of range ({0:?})")]
    IllegalHexDigit(u8),
    #[error("Tried to decode a decimal digit but it was out of range ({0:?})")]
    IllegalDecimalDigit(u8),

    /* Field validation */
    #[error("Received a response ({0:?}) with an unexpected payload size ({1:?})")]
    UnexpectedPayloadSize(Opcode, usize),
    #[error("Tried to decode an axis selector but it was out of range ({0:?})")]
    InvalidAxis(u8),
    #[error("Received a force unit code ({0:?}) that was out of the valid range (1..=6)")]
    InvalidForceUnit(u8),
    #[error("Received a torque unit code ({0:?}) that was out of the valid range (1..=6)")]
    InvalidTorqueUnit(u8),

    /* Calibration ordering */
    #[error("Received matrix coefficients before any axis selector")]
    AxisNotSelected,
    #[error("Received matrix coefficients before a usable counts-per-unit scale")]
    CountsNotSet,
}

fn check_payload_size(
    opcode: Opcode,
    payload: &[[u8; 2]],
    expected: usize,
) -> Result<(), DecodeError> {
    if payload.len() != expected {
        return Err(DecodeError::UnexpectedPayloadSize(opcode, payload.len()));
    }

    Ok(())
}

/// Stateful decoder for one sensor's responses.
///
/// Feed every frame recovered from the log through
/// [`handle_frame`](Self::handle_frame); traffic from other bus participants
/// is ignored. Calibration state accumulates across frames and a reading is
/// emitted (and recorded) each time an odd strain gauge frame completes a
/// measurement cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorDecoder {
    id_prefix: [u8; 2],
    counts_per_force: Option<NonZeroU32>,
    counts_per_torque: Option<NonZeroU32>,
    force_unit: Option<ForceUnit>,
    torque_unit: Option<TorqueUnit>,
    current_axis: Option<Axis>,
    strain_gauges: [i16; 6],
    calibration_matrix: [[f32; 6]; 6],
    readings: Vec<Reading>,
}

impl Default for SensorDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDecoder {
    pub fn new() -> Self {
        Self {
            id_prefix: DEFAULT_ID_PREFIX,
            counts_per_force: None,
            counts_per_torque: None,
            force_unit: None,
            torque_unit: None,
            current_axis: None,
            strain_gauges: [0; 6],
            calibration_matrix: [[0.0; 6]; 6],
            readings: Vec::new(),
        }
    }

    /// Consumes self and returns a new self listening for a different node
    /// address (the device family allows it to be reconfigured)
    pub fn with_id_prefix(mut self, id_prefix: [u8; 2]) -> Self {
        self.id_prefix = id_prefix;
        self
    }

    /// Routes one frame to its response handler.
    ///
    /// Frames with an empty payload or an id that does not start with this
    /// sensor's prefix are expected on a shared bus and skipped, as are
    /// reserved opcode characters. A [`DecodeError`] skips the frame too,
    /// leaving all accumulated state as it was.
    pub fn handle_frame(&mut self, frame: &LogFrame) -> Result<Option<SensorEvent>, DecodeError> {
        if frame.payload_size() == 0 || !frame.id().starts_with(&self.id_prefix) {
            return Ok(None);
        }

        let Ok(opcode) = Opcode::try_from(frame.opcode()) else {
            return Ok(None);
        };

        let payload = frame.payload();

        match opcode {
            Opcode::SgDataEven => {
                self.read_sg_even(payload)?;
                Ok(None)
            }
            Opcode::SgDataOdd => {
                self.read_sg_odd(payload)?;

                let reading = self.compute_reading();
                self.readings.push(reading);

                Ok(Some(reading.into()))
            }
            Opcode::MatrixSg01 => {
                if payload.len() == 1 {
                    self.select_axis(payload)?;
                } else {
                    self.read_matrix_pair(opcode, 0, payload)?;
                }

                Ok(None)
            }
            Opcode::MatrixSg23 => {
                self.read_matrix_pair(opcode, 2, payload)?;
                Ok(None)
            }
            Opcode::MatrixSg45 => {
                self.read_matrix_pair(opcode, 4, payload)?;
                Ok(None)
            }
            Opcode::Watchdog => self.read_watchdog(payload),
            Opcode::CountsPerUnit => {
                self.read_counts(payload)?;
                Ok(None)
            }
            Opcode::UnitCodes => {
                self.read_units(payload)?;
                Ok(None)
            }
        }
    }

    /// A 2-byte status code (not interpreted here) followed by the even
    /// strain gauges, 16 bits each.
    fn read_sg_even(&mut self, payload: &[[u8; 2]]) -> Result<(), DecodeError> {
        check_payload_size(Opcode::SgDataEven, payload, 8)?;

        let sg0 = u16_from_hex_pairs(payload[2..4].try_into().unwrap())?;
        let sg2 = u16_from_hex_pairs(payload[4..6].try_into().unwrap())?;
        let sg4 = u16_from_hex_pairs(payload[6..8].try_into().unwrap())?;

        self.strain_gauges[0] = sg0 as i16;
        self.strain_gauges[2] = sg2 as i16;
        self.strain_gauges[4] = sg4 as i16;

        Ok(())
    }

    /// The odd strain gauges; the dispatcher derives a reading afterwards.
    fn read_sg_odd(&mut self, payload: &[[u8; 2]]) -> Result<(), DecodeError> {
        check_payload_size(Opcode::SgDataOdd, payload, 6)?;

        let sg1 = u16_from_hex_pairs(payload[0..2].try_into().unwrap())?;
        let sg3 = u16_from_hex_pairs(payload[2..4].try_into().unwrap())?;
        let sg5 = u16_from_hex_pairs(payload[4..6].try_into().unwrap())?;

        self.strain_gauges[1] = sg1 as i16;
        self.strain_gauges[3] = sg3 as i16;
        self.strain_gauges[5] = sg5 as i16;

        Ok(())
    }

    /// Selects the matrix row that the coefficient frames which follow will
    /// fill in.
    fn select_axis(&mut self, payload: &[[u8; 2]]) -> Result<(), DecodeError> {
        self.current_axis = Some(Axis::try_from(u8_from_hex_nibbles(&payload[0])?)?);

        Ok(())
    }

    /// Two matrix coefficients for the selected row, scaled down by the
    /// counts-per-unit factor of that row's axis kind.
    fn read_matrix_pair(
        &mut self,
        opcode: Opcode,
        first_column: usize,
        payload: &[[u8; 2]],
    ) -> Result<(), DecodeError> {
        check_payload_size(opcode, payload, 8)?;

        let first = f32_from_hex_pairs(payload[0..4].try_into().unwrap())?;
        let second = f32_from_hex_pairs(payload[4..8].try_into().unwrap())?;

        let axis = self.current_axis.ok_or(DecodeError::AxisNotSelected)?;

        let counts = if axis.is_force() {
            self.counts_per_force
        } else {
            self.counts_per_torque
        };
        let counts = counts.ok_or(DecodeError::CountsNotSet)?.get() as f32;

        let row = &mut self.calibration_matrix[axis as usize];
        row[first_column] = first / counts;
        row[first_column + 1] = second / counts;

        Ok(())
    }

    /// The self-test byte, read as decimal. Zero reports a watchdog reset;
    /// any other value carries no state.
    fn read_watchdog(&self, payload: &[[u8; 2]]) -> Result<Option<SensorEvent>, DecodeError> {
        check_payload_size(Opcode::Watchdog, payload, 1)?;

        if u8_from_dec_digits(&payload[0])? == 0 {
            return Ok(Some(SensorEvent::WatchdogReset));
        }

        Ok(None)
    }

    /// Counts-per-force then counts-per-torque, 32 bits each. A zero on the
    /// wire cannot scale anything and stays unset.
    fn read_counts(&mut self, payload: &[[u8; 2]]) -> Result<(), DecodeError> {
        check_payload_size(Opcode::CountsPerUnit, payload, 8)?;

        let force = u32_from_hex_pairs(payload[0..4].try_into().unwrap())?;
        let torque = u32_from_hex_pairs(payload[4..8].try_into().unwrap())?;

        self.counts_per_force = NonZeroU32::new(force);
        self.counts_per_torque = NonZeroU32::new(torque);

        Ok(())
    }

    /// Force and torque unit codes, resolved against the fixed code tables.
    fn read_units(&mut self, payload: &[[u8; 2]]) -> Result<(), DecodeError> {
        check_payload_size(Opcode::UnitCodes, payload, 2)?;

        let force = ForceUnit::try_from(u8_from_hex_nibbles(&payload[0])?)?;
        let torque = TorqueUnit::try_from(u8_from_hex_nibbles(&payload[1])?)?;

        self.force_unit = Some(force);
        self.torque_unit = Some(torque);

        Ok(())
    }

    /// Multiplies the calibration matrix by the strain gauge vector. Rows
    /// whose coefficients have not arrived yet contribute zeros.
    fn compute_reading(&self) -> Reading {
        let mut force = [0.0f32; 3];
        let mut torque = [0.0f32; 3];

        for (i, row) in self.calibration_matrix.iter().enumerate() {
            let mut component = 0.0f32;

            for (coefficient, sg) in row.iter().zip(self.strain_gauges) {
                component += coefficient * f32::from(sg);
            }

            if i < 3 {
                force[i] = component;
            } else {
                torque[i - 3] = component;
            }
        }

        Reading {
            force,
            torque,
            force_unit: self.force_unit,
            torque_unit: self.torque_unit,
        }
    }

    /// Gets the readings recorded so far, one per completed measurement cycle
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Consumes self and returns the recorded readings
    pub fn into_readings(self) -> Vec<Reading> {
        self.readings
    }

    pub fn counts_per_force(&self) -> Option<u32> {
        self.counts_per_force.map(NonZeroU32::get)
    }

    pub fn counts_per_torque(&self) -> Option<u32> {
        self.counts_per_torque.map(NonZeroU32::get)
    }

    pub fn force_unit(&self) -> Option<ForceUnit> {
        self.force_unit
    }

    pub fn torque_unit(&self) -> Option<TorqueUnit> {
        self.torque_unit
    }

    pub fn current_axis(&self) -> Option<Axis> {
        self.current_axis
    }

    /// Gets the six raw strain gauge counts as last received
    pub fn strain_gauges(&self) -> &[i16; 6] {
        &self.strain_gauges
    }

    /// Gets the calibration matrix accumulated from the coefficient responses
    pub fn calibration_matrix(&self) -> &[[f32; 6]; 6] {
        &self.calibration_matrix
    }
}
