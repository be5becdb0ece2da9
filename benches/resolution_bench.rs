use anvil::plugins::{
    AmbientResolver, DependencyManifest, DependencyManifestResolver, DependencyRequest,
    EmbeddedProvider, EmbeddedResource, HostAmbientResolver, LoadContext, ManagedEntry,
    PluginScanner, ResourceChain, ResourceProvider, ShadowPolicy,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::PathBuf;
use std::sync::Arc;

/// Benchmark scanning a plugin directory of growing size
fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    let scanner = PluginScanner::new("rcl_", ".Views", "mod").unwrap();

    for count in &[10, 100, 1000] {
        let dir = tempfile::tempdir().unwrap();
        for idx in 0..*count {
            std::fs::write(dir.path().join(format!("rcl_{idx}.mod")), b"").unwrap();
            std::fs::write(dir.path().join(format!("other_{idx}.mod")), b"").unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| scanner.scan(black_box(dir.path())).unwrap());
        });
    }

    group.finish();
}

/// Benchmark bundle-first dependency resolution with ambient fallback
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("codec.mod"), b"").unwrap();
    std::fs::write(dir.path().join("shared.mod"), b"").unwrap();

    let mut manifest = DependencyManifest::default();
    manifest.dependencies.insert(
        "codec".to_string(),
        ManagedEntry {
            version: Some("1.0.0".to_string()),
            path: PathBuf::from("codec.mod"),
        },
    );
    let ambient: Arc<dyn AmbientResolver> = Arc::new(HostAmbientResolver::new(
        vec![dir.path().to_path_buf()],
        "mod",
        false,
    ));

    group.bench_function("bundle_hit", |b| {
        let request = DependencyRequest::new("codec").with_version("1.0.0");
        b.iter(|| {
            let resolver = DependencyManifestResolver::new(dir.path(), manifest.clone());
            let mut ctx = LoadContext::new("rcl_a", resolver, Arc::clone(&ambient));
            ctx.resolve(black_box(&request)).unwrap()
        });
    });

    group.bench_function("ambient_fallback", |b| {
        let request = DependencyRequest::new("shared");
        b.iter(|| {
            let resolver = DependencyManifestResolver::new(dir.path(), manifest.clone());
            let mut ctx = LoadContext::new("rcl_a", resolver, Arc::clone(&ambient));
            ctx.resolve(black_box(&request)).unwrap()
        });
    });

    group.finish();
}

/// Benchmark first-match lookups through a long provider chain
fn bench_chain_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_lookup");

    let provider = |name: String, file: &str| {
        let resources = vec![EmbeddedResource {
            path: format!("wwwroot/{file}"),
            bytes: vec![0u8; 256],
        }];
        Box::new(EmbeddedProvider::new(name, "wwwroot", &resources))
    };

    let mut chain = ResourceChain::new(provider("host".to_string(), "host.css"), ShadowPolicy::Allow);
    for idx in 0..64 {
        chain = chain.compose(provider(format!("rcl_{idx}"), &format!("p{idx}.css")));
    }

    group.bench_function("host_hit", |b| {
        b.iter(|| chain.lookup(black_box("/host.css")));
    });

    group.bench_function("last_member_hit", |b| {
        b.iter(|| chain.lookup(black_box("/p63.css")));
    });

    group.bench_function("miss", |b| {
        b.iter(|| chain.lookup(black_box("/missing.css")));
    });

    group.finish();
}

criterion_group!(benches, bench_scan, bench_resolution, bench_chain_lookup);
criterion_main!(benches);
