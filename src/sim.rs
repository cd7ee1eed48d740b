//! Bounded random-walk models producing plausible ICU device readings.
//!
//! Each model advances one tick per [`step`](DeviceModel::step) and renders
//! its current readings as the OBX set for one ORU^R01 message. Seeded
//! construction gives reproducible walks.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::message::{Metric, OruBuilder, Units};

/// Bedside monitor panel, LOINC coded.
pub const MONITOR_METRICS: &[Metric] = &[
    Metric {
        key: "HR",
        code: "8867-4",
        text: "Heart rate",
        coding_system: "LN",
        units: "/min",
    },
    Metric {
        key: "SpO2",
        code: "59408-5",
        text: "Oxygen saturation in Arterial blood by Pulse oximetry",
        coding_system: "LN",
        units: "%",
    },
    Metric {
        key: "Temp",
        code: "8310-5",
        text: "Body temperature",
        coding_system: "LN",
        units: "Cel",
    },
    Metric {
        key: "Sys",
        code: "8480-6",
        text: "Systolic blood pressure",
        coding_system: "LN",
        units: "mm[Hg]",
    },
    Metric {
        key: "Dia",
        code: "8462-4",
        text: "Diastolic blood pressure",
        coding_system: "LN",
        units: "mm[Hg]",
    },
    Metric {
        key: "MAP",
        code: "8478-0",
        text: "Mean blood pressure",
        coding_system: "LN",
        units: "mm[Hg]",
    },
];

/// Ventilator panel, LOINC coded.
pub const VENTILATOR_METRICS: &[Metric] = &[
    Metric {
        key: "RR",
        code: "9279-1",
        text: "Respiratory rate",
        coding_system: "LN",
        units: "/min",
    },
    Metric {
        key: "VTe",
        code: "19868-9",
        text: "Tidal volume setting Ventilator",
        coding_system: "LN",
        units: "mL",
    },
    Metric {
        key: "PEEP",
        code: "20077-4",
        text: "Positive end expiratory pressure setting Ventilator",
        coding_system: "LN",
        units: "cm[H2O]",
    },
    Metric {
        key: "FiO2",
        code: "3150-0",
        text: "Oxygen inhaled concentration",
        coding_system: "LN",
        units: "%",
    },
];

const DRUGS: &[(&str, &str)] = &[
    ("NORAD", "Norepinephrine"),
    ("PROP", "Propofol"),
    ("INS", "Insulin"),
    ("DEX", "Dexmedetomidine"),
    ("DOB", "Dobutamine"),
];

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn walk(rng: &mut StdRng, value: f64, lo: f64, hi: f64, step: f64) -> f64 {
    (value + rng.gen_range(-step..=step)).clamp(lo, hi)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One simulated device: advance a tick, then emit that tick's OBX set.
pub trait DeviceModel {
    fn step(&mut self);
    fn observations(&self, builder: &OruBuilder, observation_time: &str) -> Vec<String>;
    fn default_device_id(&self) -> &'static str;
}

/// Bedside monitor: heart rate, SpO2, temperature, blood pressures.
pub struct MonitorModel {
    rng: StdRng,
    hr: f64,
    spo2: f64,
    temp: f64,
    sys: f64,
    dia: f64,
}

impl MonitorModel {
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = rng_for(seed);
        MonitorModel {
            hr: rng.gen_range(70.0..=95.0),
            spo2: rng.gen_range(95.0..=99.0),
            temp: rng.gen_range(36.5..=37.3),
            sys: rng.gen_range(110.0..=130.0),
            dia: rng.gen_range(70.0..=85.0),
            rng,
        }
    }

    /// Mean arterial pressure derived from the pressure walks.
    pub fn map(&self) -> f64 {
        self.dia + (self.sys - self.dia) / 3.0
    }

    /// Current readings, rounded the way the wire reports them.
    pub fn snapshot(&self) -> HashMap<&'static str, f64> {
        HashMap::from([
            ("HR", self.hr.round()),
            ("SpO2", round1(self.spo2)),
            ("Temp", round1(self.temp)),
            ("Sys", self.sys.round()),
            ("Dia", self.dia.round()),
            ("MAP", self.map().round()),
        ])
    }
}

impl DeviceModel for MonitorModel {
    fn step(&mut self) {
        self.hr = walk(&mut self.rng, self.hr, 45.0, 150.0, 2.0);
        self.spo2 = walk(&mut self.rng, self.spo2, 80.0, 100.0, 0.4);
        self.temp = walk(&mut self.rng, self.temp, 35.0, 40.0, 0.08);
        self.sys = walk(&mut self.rng, self.sys, 80.0, 200.0, 2.5);
        self.dia = walk(&mut self.rng, self.dia, 40.0, 120.0, 2.0);
    }

    fn observations(&self, builder: &OruBuilder, observation_time: &str) -> Vec<String> {
        builder.panel_observations(MONITOR_METRICS, &self.snapshot(), observation_time)
    }

    fn default_device_id(&self) -> &'static str {
        "MONITOR^ICU-01"
    }
}

/// Ventilator: respiratory rate, tidal volume, PEEP, FiO2.
pub struct VentilatorModel {
    rng: StdRng,
    rr: f64,
    vte: f64,
    peep: f64,
    fio2: f64,
}

impl VentilatorModel {
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = rng_for(seed);
        VentilatorModel {
            rr: rng.gen_range(12.0..=20.0),
            vte: rng.gen_range(380.0..=520.0),
            peep: rng.gen_range(4.0..=8.0),
            fio2: rng.gen_range(0.30..=0.5),
            rng,
        }
    }

    pub fn snapshot(&self) -> HashMap<&'static str, f64> {
        HashMap::from([
            ("RR", self.rr.round()),
            ("VTe", self.vte.round()),
            ("PEEP", round1(self.peep)),
            ("FiO2", round1(self.fio2 * 100.0)), // reported as a percentage
        ])
    }
}

impl DeviceModel for VentilatorModel {
    fn step(&mut self) {
        self.rr = walk(&mut self.rng, self.rr, 8.0, 35.0, 0.8);
        self.vte = walk(&mut self.rng, self.vte, 200.0, 800.0, 15.0);
        self.peep = walk(&mut self.rng, self.peep, 0.0, 20.0, 0.5);
        self.fio2 = walk(&mut self.rng, self.fio2, 0.21, 1.0, 0.02);
    }

    fn observations(&self, builder: &OruBuilder, observation_time: &str) -> Vec<String> {
        builder.panel_observations(VENTILATOR_METRICS, &self.snapshot(), observation_time)
    }

    fn default_device_id(&self) -> &'static str {
        "VENT^ICU-01"
    }
}

/// Infusion pump: one drug, a wandering rate and a cumulative volume.
pub struct PumpModel {
    rng: StdRng,
    drug_name: &'static str,
    rate: f64,
    volume: f64,
}

impl PumpModel {
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = rng_for(seed);
        let (_, drug_name) = DRUGS[rng.gen_range(0..DRUGS.len())];
        PumpModel {
            drug_name,
            rate: rng.gen_range(2.0..=20.0), // mL/h
            volume: 0.0,
            rng,
        }
    }

    pub fn drug_name(&self) -> &'static str {
        self.drug_name
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }
}

impl DeviceModel for PumpModel {
    fn step(&mut self) {
        self.rate = walk(&mut self.rng, self.rate, 0.0, 50.0, 1.5);
        self.volume += self.rate / 60.0; // one minute of infusion per tick
    }

    fn observations(&self, builder: &OruBuilder, observation_time: &str) -> Vec<String> {
        vec![
            builder.obx_numeric(
                1,
                "PUMP_RATE",
                "Infusion rate",
                "L",
                round1(self.rate),
                Units::ucum("mL/h"),
                Some(observation_time),
                "",
            ),
            builder.obx_numeric(
                2,
                "PUMP_VOL",
                "Volume infused",
                "L",
                round1(self.volume),
                Units::ucum("mL"),
                Some(observation_time),
                "",
            ),
            builder.obx_text(
                3,
                "PUMP_DRUG",
                "Drug name",
                "L",
                self.drug_name,
                Some(observation_time),
                "",
            ),
        ]
    }

    fn default_device_id(&self) -> &'static str {
        "PUMP^ICU-01"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_walks_are_reproducible() {
        let mut a = MonitorModel::new(Some(42));
        let mut b = MonitorModel::new(Some(42));
        for _ in 0..10 {
            a.step();
            b.step();
        }
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn monitor_walk_stays_in_bounds() {
        let mut model = MonitorModel::new(Some(7));
        for _ in 0..1000 {
            model.step();
            let snap = model.snapshot();
            assert!((45.0..=150.0).contains(&snap["HR"]));
            assert!((80.0..=100.0).contains(&snap["SpO2"]));
            assert!((35.0..=40.0).contains(&snap["Temp"]));
            assert!((80.0..=200.0).contains(&snap["Sys"]));
            assert!((40.0..=120.0).contains(&snap["Dia"]));
        }
    }

    #[test]
    fn monitor_snapshot_covers_the_panel() {
        let model = MonitorModel::new(Some(1));
        let snap = model.snapshot();
        for metric in MONITOR_METRICS {
            assert!(snap.contains_key(metric.key), "missing {}", metric.key);
        }
    }

    #[test]
    fn monitor_observations_number_the_whole_panel() {
        let builder = OruBuilder::new();
        let model = MonitorModel::new(Some(3));
        let observations = model.observations(&builder, "20250101120000");

        assert_eq!(observations.len(), MONITOR_METRICS.len());
        for (i, obx) in observations.iter().enumerate() {
            assert!(obx.starts_with(&format!("OBX|{}|NM|", i + 1)));
        }
    }

    #[test]
    fn ventilator_reports_fio2_as_percent() {
        let model = VentilatorModel::new(Some(5));
        let snap = model.snapshot();
        assert!((21.0..=100.0).contains(&snap["FiO2"]));
    }

    #[test]
    fn pump_volume_only_accumulates() {
        let mut model = PumpModel::new(Some(11));
        let mut last = model.volume();
        for _ in 0..100 {
            model.step();
            assert!(model.volume() >= last);
            last = model.volume();
        }
    }

    #[test]
    fn pump_emits_rate_volume_and_drug() {
        let builder = OruBuilder::new();
        let model = PumpModel::new(Some(2));
        let observations = model.observations(&builder, "20250101120000");

        assert_eq!(observations.len(), 3);
        assert!(observations[0].contains("|NM|PUMP_RATE^Infusion rate^L|"));
        assert!(observations[1].contains("|NM|PUMP_VOL^Volume infused^L|"));
        assert!(observations[2].contains("|TX|PUMP_DRUG^Drug name^L|"));
        assert!(observations[2].contains(model.drug_name()));
    }
}
