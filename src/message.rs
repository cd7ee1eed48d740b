//! HL7 v2 message construction: field values, segment lines, and full
//! ORU^R01 assembly.
//!
//! A message is plain text once assembled: segments are `\r`-terminated
//! lines of `|`-separated fields, and a field is either empty, a scalar, or
//! a `^`-joined composite. Field positions are contractual; trailing fields
//! are padded with empties so every populated position lands where the
//! receiving system expects it.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::iter;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Separator between fields within a segment.
pub const FIELD_SEP: char = '|';
/// Separator between components within a field.
pub const COMPONENT_SEP: char = '^';
/// Terminator for a serialized segment line.
pub const SEGMENT_TERMINATOR: char = '\r';
/// The encoding characters carried in MSH-2.
pub const ENCODING_CHARS: &str = "^~\\&";

/// An HL7 timestamp (`YYYYMMDDHHMMSS`) for the given instant.
pub fn hl7_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y%m%d%H%M%S").to_string()
}

/// An HL7 timestamp for the current instant.
pub fn now_timestamp() -> String {
    hl7_timestamp(Utc::now())
}

// Numbers render without a trailing `.0`: receiving systems expect `82`,
// not `82.0`, for whole-number observations.
fn fmt_num(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// One field value within a segment.
///
/// Rendering is total: an empty field renders as the empty string and a
/// composite joins its parts with `^`, preserving positional emptiness
/// (`a^^^b`, never `a^b`). No escaping of separator characters embedded in
/// scalar text is performed; callers must not pass raw separators in free
/// text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Empty,
    Scalar(String),
    Composite(Vec<Field>),
}

impl Field {
    /// A scalar field; empty text collapses to [`Field::Empty`].
    pub fn scalar(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Field::Empty
        } else {
            Field::Scalar(text)
        }
    }

    /// A numeric scalar rendered as text.
    pub fn numeric(value: f64) -> Self {
        Field::Scalar(fmt_num(value))
    }

    /// A `^`-joined composite from textual parts.
    pub fn composite<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Field::Composite(parts.into_iter().map(Field::from).collect())
    }
}

impl From<&str> for Field {
    fn from(text: &str) -> Self {
        Field::scalar(text)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Empty => Ok(()),
            Field::Scalar(text) => f.write_str(text),
            Field::Composite(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_char(COMPONENT_SEP)?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
        }
    }
}

/// Serializes one segment: `name + '|' + fields joined by '|' + '\r'`.
pub fn segment(name: &str, fields: &[Field]) -> String {
    let mut line = String::with_capacity(name.len() + fields.len() * 8);
    line.push_str(name);
    for field in fields {
        line.push(FIELD_SEP);
        let _ = write!(line, "{}", field); // writing to a String cannot fail
    }
    line.push(SEGMENT_TERMINATOR);
    line
}

/// Message-control-id source: `MSG<unix-seconds>-<counter>`.
///
/// The timestamp component is captured once at construction; the counter is
/// strictly increasing, so ids drawn from one sequence never repeat. Owned
/// exclusively by one builder instance and deliberately unsynchronized; a
/// shared id space needs an explicitly synchronized wrapper.
#[derive(Debug)]
pub struct ControlIdSequence {
    epoch_seconds: i64,
    counter: u64,
}

impl ControlIdSequence {
    pub fn new() -> Self {
        ControlIdSequence {
            epoch_seconds: Utc::now().timestamp(),
            counter: 1,
        }
    }

    /// Draws the next unique control id.
    pub fn next_id(&mut self) -> String {
        let id = format!("MSG{}-{}", self.epoch_seconds, self.counter);
        self.counter += 1;
        id
    }
}

impl Default for ControlIdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Units for a numeric observation (`code^text^system`).
#[derive(Debug, Clone, Copy)]
pub struct Units<'a> {
    pub code: &'a str,
    pub text: &'a str,
    pub system: &'a str,
}

impl<'a> Units<'a> {
    pub fn new(code: &'a str, text: &'a str, system: &'a str) -> Self {
        Units { code, text, system }
    }

    /// Units identified by a UCUM code alone, e.g. `/min^^UCUM`.
    pub fn ucum(code: &'a str) -> Self {
        Units {
            code,
            text: "",
            system: "UCUM",
        }
    }

    fn into_field(self) -> Field {
        Field::composite([self.code, self.text, self.system])
    }
}

/// One named metric of a device panel, mapping a snapshot key to its coded
/// observation identity and units.
#[derive(Debug, Clone, Copy)]
pub struct Metric {
    /// Key into a device snapshot's value map.
    pub key: &'static str,
    /// Observation code (LOINC or local).
    pub code: &'static str,
    pub text: &'static str,
    pub coding_system: &'static str,
    /// UCUM units code.
    pub units: &'static str,
}

/// Builds HL7 v2.5 ORU^R01 messages carrying vital-sign observations.
///
/// Each builder owns its own [`ControlIdSequence`]; it is not safe for
/// unsynchronized concurrent use (see the crate docs on concurrency).
#[derive(Debug)]
pub struct OruBuilder {
    sending_app: String,
    sending_fac: String,
    receiving_app: String,
    receiving_fac: String,
    version: String,
    control_ids: ControlIdSequence,
}

impl Default for OruBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OruBuilder {
    pub fn new() -> Self {
        OruBuilder {
            sending_app: "ICU_SIM".to_string(),
            sending_fac: "ICU".to_string(),
            receiving_app: "LIS".to_string(),
            receiving_fac: "HOSP".to_string(),
            version: "2.5".to_string(),
            control_ids: ControlIdSequence::new(),
        }
    }

    pub fn sending_app(mut self, app: impl Into<String>) -> Self {
        self.sending_app = app.into();
        self
    }

    pub fn sending_facility(mut self, fac: impl Into<String>) -> Self {
        self.sending_fac = fac.into();
        self
    }

    pub fn receiving_app(mut self, app: impl Into<String>) -> Self {
        self.receiving_app = app.into();
        self
    }

    pub fn receiving_facility(mut self, fac: impl Into<String>) -> Self {
        self.receiving_fac = fac.into();
        self
    }

    /// Message header segment. Draws a fresh control id per call.
    pub fn msh(&mut self, message_time: &str) -> String {
        let control_id = self.control_ids.next_id();
        segment(
            "MSH",
            &[
                Field::scalar(ENCODING_CHARS),
                Field::scalar(self.sending_app.as_str()),
                Field::scalar(self.sending_fac.as_str()),
                Field::scalar(self.receiving_app.as_str()),
                Field::scalar(self.receiving_fac.as_str()),
                Field::scalar(message_time),
                Field::Empty, // security
                Field::scalar("ORU^R01^ORU_R01"),
                Field::scalar(control_id),
                Field::scalar("P"),
                Field::scalar(self.version.as_str()),
            ],
        )
    }

    /// Patient identification segment. Sex is reported as `U` (unknown).
    pub fn pid(&self, patient_id: &str, patient_name: &str) -> String {
        let mut fields = vec![
            Field::scalar("1"),
            Field::Empty,
            Field::composite([patient_id, "", "", "HOSP^MR"]),
            Field::Empty,
            Field::scalar(patient_name),
        ];
        fields.extend(iter::repeat(Field::Empty).take(10));
        fields.push(Field::scalar("U"));
        segment("PID", &fields)
    }

    /// Order segment for the vital-signs panel. The placer order number
    /// embeds a freshly generated unique token.
    pub fn obr(&self, message_time: &str, device_id: &str) -> String {
        let placer = Uuid::new_v4().to_string();
        let mut fields = vec![
            Field::scalar("1"),
            Field::composite([placer.as_str(), "ICU_SIM"]),
            Field::composite([device_id, "DEVICE"]),
            Field::composite([
                "VITALS",
                "Vital Signs Panel",
                "L",
                "76499-3",
                "Vital signs",
                "LN",
            ]),
        ];
        fields.extend(iter::repeat(Field::Empty).take(9));
        fields.push(Field::scalar(message_time));
        fields.extend(iter::repeat(Field::Empty).take(4));
        fields.push(Field::scalar("F"));
        segment("OBR", &fields)
    }

    /// Numeric (`NM`) observation segment.
    ///
    /// `observation_time` defaults to the current instant when absent.
    #[allow(clippy::too_many_arguments)]
    pub fn obx_numeric(
        &self,
        set_id: usize,
        code: &str,
        text: &str,
        coding_system: &str,
        value: f64,
        units: Units<'_>,
        observation_time: Option<&str>,
        sub_id: &str,
    ) -> String {
        self.obx(
            set_id,
            "NM",
            Field::composite([code, text, coding_system]),
            Field::numeric(value),
            units.into_field(),
            observation_time,
            sub_id,
        )
    }

    /// Text (`TX`) observation segment, e.g. an infusion pump's drug name.
    #[allow(clippy::too_many_arguments)]
    pub fn obx_text(
        &self,
        set_id: usize,
        code: &str,
        text: &str,
        coding_system: &str,
        value: &str,
        observation_time: Option<&str>,
        sub_id: &str,
    ) -> String {
        self.obx(
            set_id,
            "TX",
            Field::composite([code, text, coding_system]),
            Field::scalar(value),
            Field::Empty,
            observation_time,
            sub_id,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn obx(
        &self,
        set_id: usize,
        value_type: &str,
        observation_id: Field,
        value: Field,
        units: Field,
        observation_time: Option<&str>,
        sub_id: &str,
    ) -> String {
        let time = observation_time
            .map(str::to_owned)
            .unwrap_or_else(now_timestamp);
        let mut fields = vec![
            Field::scalar(set_id.to_string()),
            Field::scalar(value_type),
            observation_id,
            Field::scalar(sub_id),
            value,
            units,
        ];
        fields.extend(iter::repeat(Field::Empty).take(5));
        fields.push(Field::scalar("F"));
        fields.push(Field::Empty);
        fields.push(Field::scalar(time));
        segment("OBX", &fields)
    }

    /// One OBX per metric present in `values`, in table order, with densely
    /// renumbered set-ids. Metrics whose value is absent are skipped
    /// entirely rather than emitted as empty segments.
    pub fn panel_observations(
        &self,
        metrics: &[Metric],
        values: &HashMap<&str, f64>,
        observation_time: &str,
    ) -> Vec<String> {
        let mut observations = Vec::with_capacity(metrics.len());
        for metric in metrics {
            if let Some(&value) = values.get(metric.key) {
                observations.push(self.obx_numeric(
                    observations.len() + 1,
                    metric.code,
                    metric.text,
                    metric.coding_system,
                    value,
                    Units::ucum(metric.units),
                    Some(observation_time),
                    "",
                ));
            }
        }
        observations
    }

    /// Assembles a complete message: header + patient + order + the given
    /// observation segments.
    ///
    /// `message_time` defaults to the current instant and is shared by the
    /// header and order segments, keeping the message internally
    /// time-consistent.
    pub fn build_message(
        &mut self,
        patient_id: &str,
        patient_name: &str,
        device_id: &str,
        observations: &[String],
        message_time: Option<&str>,
    ) -> String {
        let time = message_time
            .map(str::to_owned)
            .unwrap_or_else(now_timestamp);
        let mut message = self.msh(&time);
        message.push_str(&self.pid(patient_id, patient_name));
        message.push_str(&self.obr(&time, device_id));
        for obx in observations {
            message.push_str(obx);
        }
        message
    }
}

/// Minimal two-segment acknowledgment for a received message, always
/// application-accept (`AA`). No negative-acknowledgment path exists.
pub fn ack_message(control_id: &str) -> String {
    let mut message = segment(
        "MSH",
        &[
            Field::scalar(ENCODING_CHARS),
            Field::scalar("MLLP_SERVER"),
            Field::scalar("TEST_FAC"),
            Field::Empty,
            Field::Empty,
            Field::scalar(now_timestamp()),
            Field::Empty,
            Field::scalar("ACK^A01"),
            Field::scalar(control_id),
            Field::scalar("P"),
            Field::scalar("2.5"),
        ],
    );
    message.push_str(&segment(
        "MSA",
        &[Field::scalar("AA"), Field::scalar(control_id)],
    ));
    message
}

/// The control id (MSH-10) of an encoded message, extracted positionally
/// from the header segment. Returns `None` when the field is missing or
/// empty; no further parsing or validation is attempted.
pub fn control_id(message: &str) -> Option<&str> {
    let header = message.split(SEGMENT_TERMINATOR).next()?;
    if !header.starts_with("MSH") {
        return None;
    }
    match header.split(FIELD_SEP).nth(9) {
        Some("") | None => None,
        Some(id) => Some(id),
    }
}
