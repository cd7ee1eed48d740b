use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio_util::codec::{Decoder, Encoder};

use hl7_vitals_mllp::sim::{DeviceModel, MonitorModel};
use hl7_vitals_mllp::{MllpCodec, OruBuilder};

fn sample_message() -> String {
    let mut builder = OruBuilder::new();
    let mut model = MonitorModel::new(Some(42));
    model.step();
    let time = "20250101120000";
    let observations = model.observations(&builder, time);
    builder.build_message("123456", "DOE^JOHN", "MONITOR^ICU-01", &observations, Some(time))
}

fn bench_encode(c: &mut Criterion) {
    let message = sample_message();
    c.bench_function("mllp_encode", |b| {
        b.iter(|| {
            let mut codec = MllpCodec::new();
            let mut wire = BytesMut::with_capacity(message.len() + 3);
            codec
                .encode(BytesMut::from(message.as_str()), &mut wire)
                .unwrap();
            black_box(wire);
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    let framed = format!("\x0B{}\x1C\x0D", sample_message());
    c.bench_function("mllp_decode", |b| {
        b.iter(|| {
            let mut codec = MllpCodec::new();
            let mut wire = BytesMut::from(framed.as_str());
            black_box(codec.decode(&mut wire).unwrap());
        })
    });
}

fn bench_build_message(c: &mut Criterion) {
    c.bench_function("build_vitals_message", |b| {
        let mut builder = OruBuilder::new();
        let mut model = MonitorModel::new(Some(1));
        let time = "20250101120000";
        b.iter(|| {
            model.step();
            let observations = model.observations(&builder, time);
            black_box(builder.build_message(
                "123456",
                "DOE^JOHN",
                "MONITOR^ICU-01",
                &observations,
                Some(time),
            ));
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_build_message);
criterion_main!(benches);
