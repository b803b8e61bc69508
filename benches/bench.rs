use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cryptopan_wrapper::{Anonymizer, BackendId, Family, Key};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

fn anonymization_benchmark(c: &mut Criterion) {
    let key = Key::generate();
    let ipv4 = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
    let ipv6 = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));

    for backend in BackendId::ALL {
        let mut group = c.benchmark_group(format!("Anonymization ({backend})"));
        let anonymizer = Anonymizer::with_key(key.clone(), backend).unwrap();

        // String-based anonymization
        group.bench_function("IPv4 Anonymize", |b| {
            b.iter(|| {
                black_box(anonymizer.anonymize_str(black_box("192.168.1.1")).unwrap());
            })
        });
        group.bench_function("IPv4 Deanonymize", |b| {
            let anonymized = anonymizer.anonymize_ipaddr(ipv4).unwrap();
            b.iter(|| {
                black_box(anonymizer.deanonymize_ipaddr(black_box(anonymized)).unwrap());
            })
        });

        // Integer anonymization
        group.bench_function("IPv4 Numeric", |b| {
            b.iter(|| {
                black_box(
                    anonymizer
                        .anonymize_numeric(black_box(0xc0a8_0101), Family::V4)
                        .unwrap(),
                );
            })
        });

        if backend != BackendId::HostOrder {
            group.bench_function("IPv6 Anonymize", |b| {
                b.iter(|| {
                    black_box(anonymizer.anonymize_str(black_box("2001:db8::1")).unwrap());
                })
            });
            group.bench_function("IPv6 Deanonymize", |b| {
                let anonymized = anonymizer.anonymize_ipaddr(ipv6).unwrap();
                b.iter(|| {
                    black_box(anonymizer.deanonymize_ipaddr(black_box(anonymized)).unwrap());
                })
            });
        }

        group.finish();
    }
}

fn initialization_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Initialization");
    let key = Key::generate();

    for backend in BackendId::ALL {
        group.bench_function(backend.name(), |b| {
            b.iter(|| {
                black_box(Anonymizer::with_key(key.clone(), backend).unwrap());
            })
        });
    }

    group.bench_function("Key Generation", |b| {
        b.iter(|| {
            black_box(Key::generate());
        })
    });
}

criterion_group!(benches, anonymization_benchmark, initialization_benchmark);
criterion_main!(benches);
