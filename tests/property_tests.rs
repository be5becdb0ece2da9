//! Property tests for scan ordering and per-bundle isolation

mod common;

use anvil::plugins::{
    AmbientResolver, Bundle, BundleLoader, HostAmbientResolver, ModuleKind, PluginScanner,
    ResolutionSource,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::tempdir;

use common::{write, JsonModuleLoader};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn scan_is_sorted_and_exact(
        matching in prop::collection::btree_set("[a-z0-9_]{1,12}", 0..12),
        other in prop::collection::btree_set("[a-z0-9_]{1,12}", 0..12),
    ) {
        let dir = tempdir().unwrap();
        for stem in &matching {
            write(dir.path(), &format!("rcl_{stem}.mod"), "");
        }
        for stem in &other {
            write(dir.path(), &format!("x{stem}.mod"), "");
            write(dir.path(), &format!("rcl_{stem}.txt"), "");
        }

        let scanner = PluginScanner::new("rcl_", ".Views", "mod").unwrap();
        let first = scanner.scan(dir.path()).unwrap();
        let second = scanner.scan(dir.path()).unwrap();
        prop_assert_eq!(&first, &second);

        let names: Vec<String> = first
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        let expected: BTreeSet<String> =
            matching.iter().map(|stem| format!("rcl_{stem}.mod")).collect();
        prop_assert_eq!(names, expected.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn bundles_only_see_their_own_version(
        versions in prop::collection::vec("[0-9]\\.[0-9]\\.[0-9]", 2..5),
    ) {
        let plugins = tempdir().unwrap();
        let host = tempdir().unwrap();
        let root = plugins.path();

        for (idx, version) in versions.iter().enumerate() {
            write(root, &format!("rcl_{idx}.mod"),
                r#"{ "name": "p", "imports": [{ "kind": "managed", "name": "shared" }] }"#);
            write(root, &format!("rcl_{idx}.deps/shared.mod"), version);
            write(root, &format!("rcl_{idx}.deps.json"), &format!(
                r#"{{ "dependencies": {{ "shared": {{ "version": "{version}", "path": "rcl_{idx}.deps/shared.mod" }} }} }}"#
            ));
        }

        let ambient: Arc<dyn AmbientResolver> =
            Arc::new(HostAmbientResolver::new(vec![host.path().to_path_buf()], "mod", false));
        let loader = BundleLoader::new(Box::new(JsonModuleLoader), ambient);

        for (idx, version) in versions.iter().enumerate() {
            let bundle = Bundle::from_module(root.join(format!("rcl_{idx}.mod")), ModuleKind::Code).unwrap();
            let handle = loader.load(&bundle).unwrap();
            let resolved = &handle.module().context().resolved()[0];

            prop_assert_eq!(resolved.source, ResolutionSource::Bundle);
            let contents = std::fs::read_to_string(&resolved.path).unwrap();
            prop_assert_eq!(&contents, version);
        }
    }
}
