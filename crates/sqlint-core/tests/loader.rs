//! Integration tests for the plugin loader's descriptor protocol.
//!
//! Real dynamic loading of a compiled plugin is exercised manually with the
//! `sqlint-plugin-demo` cdylib; these tests cover the protocol paths that
//! need no compiled artifact: disabled descriptors, missing files, malformed
//! libraries, and bulkhead isolation between descriptors.

use std::path::{Path, PathBuf};

use sqlint_core::{load_plugins, PluginDescriptor};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn disabled_descriptor_yields_empty_record_without_file_access() {
    // The path is invalid on purpose; a disabled descriptor must not care.
    let loaded = load_plugins(&[PluginDescriptor::disabled("/no/such/dir/plugin.so")]);

    assert_eq!(loaded.len(), 1);
    assert!(!loaded[0].enabled);
    assert!(loaded[0].error.is_none());
    assert!(loaded[0].providers().is_empty());
    assert!(loaded[0].admissions.is_empty());
    assert!(loaded[0].isolation_handle().is_none());
}

#[test]
fn missing_file_yields_error_and_no_providers() {
    let loaded = load_plugins(&[PluginDescriptor::new("/no/such/dir/plugin.so")]);

    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].enabled);
    let error = loaded[0].error.as_deref().expect("error recorded");
    assert!(error.contains("file not found"));
    assert!(error.contains("plugin.so"));
    assert!(loaded[0].providers().is_empty());
}

#[test]
fn malformed_library_is_contained_to_its_own_record() {
    let loaded = load_plugins(&[PluginDescriptor::new(fixture("not_a_library.so"))]);

    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].enabled);
    assert!(loaded[0].error.is_some());
    assert!(loaded[0].providers().is_empty());
}

#[test]
fn one_record_per_descriptor_in_input_order() {
    let descriptors = [
        PluginDescriptor::new(fixture("not_a_library.so")),
        PluginDescriptor::disabled("/skipped.so"),
        PluginDescriptor::new("/missing.so"),
    ];

    let loaded = load_plugins(&descriptors);

    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded[0].path, descriptors[0].path);
    assert_eq!(loaded[1].path, descriptors[1].path);
    assert_eq!(loaded[2].path, descriptors[2].path);

    // Each record stands alone: the malformed library did not take down the
    // other descriptors.
    assert!(loaded[0].error.is_some());
    assert!(loaded[1].error.is_none() && !loaded[1].enabled);
    assert!(loaded[2].error.as_deref().unwrap().contains("file not found"));
}

#[test]
fn descriptor_enabled_defaults_to_true_in_serde() {
    let descriptor: PluginDescriptor =
        serde_json::from_str(r#"{"path": "/some/plugin.so"}"#).unwrap();
    assert!(descriptor.enabled);

    let descriptor: PluginDescriptor =
        serde_json::from_str(r#"{"path": "/some/plugin.so", "enabled": false}"#).unwrap();
    assert!(!descriptor.enabled);
}
