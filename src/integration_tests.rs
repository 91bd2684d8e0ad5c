// ABOUTME: Integration tests decoding complete synthetic boards end to end
// ABOUTME: Exercises blob reading, schema typing, tree building and every fixup pass together

use crate::dtb::{DtbError, Fdt};
use crate::schema::SchemaIndex;
use crate::testing::{BlobBuilder, cells};
use crate::tree::Node;
use crate::value::PLACEHOLDER_PHANDLE;
use crate::{DecodeSession, Decoded, Diagnostic, PropertyValue, unflatten_blob};

const PH: u32 = PLACEHOLDER_PHANDLE as u32;

const SCHEMA: &str = r#"{
    "properties": {
        "compatible": { "type": ["string-array"] },
        "model": { "type": ["string"] },
        "status": { "type": ["string"] },
        "bootargs": { "type": ["string"] },
        "interrupt-controller": { "type": ["flag"] },
        "gpio-controller": { "type": ["flag"] },
        "phandle": { "type": ["phandle"] },
        "interrupt-parent": { "type": ["phandle"] },
        "reg": { "type": ["uint32-matrix"] },
        "ranges": { "type": ["flag", "uint32-matrix"] },
        "interrupts": { "type": ["uint32-matrix"] },
        "clock-frequency": { "type": ["uint32"] },
        "clocks": { "type": ["phandle-array"] }
    },
    "patterns": [
        { "pattern": "-gpios?$", "type": ["phandle-array"] },
        { "pattern": "^#.*-cells$", "type": ["uint32"] }
    ]
}"#;

/// A small board in the shape QEMU's virt machine produces
fn board_dtb() -> Vec<u8> {
    BlobBuilder::new()
        .begin("")
        .prop_cells("#address-cells", &[2])
        .prop_cells("#size-cells", &[2])
        .prop("compatible", b"acme,board\0acme,soc\0")
        .prop("model", b"Acme Board\0")
        .prop_cells("interrupt-parent", &[1])
        .begin("intc@8000000")
        .prop_cells("phandle", &[1])
        .prop_cells("#interrupt-cells", &[3])
        .prop("interrupt-controller", b"")
        .prop_cells("reg", &[0, 0x800_0000, 0, 0x1_0000])
        .end()
        .begin("gpio@9000000")
        .prop_cells("phandle", &[2])
        .prop_cells("#gpio-cells", &[2])
        .prop("gpio-controller", b"")
        .prop_cells("reg", &[0, 0x900_0000, 0, 0x1000])
        .prop_cells("interrupts", &[0, 7, 4])
        .end()
        .begin("soc")
        .prop_cells("#address-cells", &[1])
        .prop_cells("#size-cells", &[1])
        .prop_cells("ranges", &[0, 0, 0x4000_0000, 0x1000_0000])
        .begin("serial@1000")
        .prop("compatible", b"ns16550a\0")
        .prop_cells("reg", &[0x1000, 0x100])
        .prop_cells("interrupts", &[0, 1, 4])
        .prop_cells("clock-frequency", &[3_686_400])
        .prop("status", b"okay\0")
        .end()
        .begin("leds")
        .nop()
        .prop_cells("reset-gpios", &[2, 5, 0, 2, 6, 1])
        .prop_cells("vendor,calibration", &[1, 2])
        .end()
        .end()
        .begin("aliases")
        .prop("serial0", b"/soc/serial@1000\0")
        .end()
        .begin("chosen")
        .prop("bootargs", b"console=ttyS0\0")
        .end()
        .end()
        .finish()
}

fn schema() -> SchemaIndex {
    SchemaIndex::from_json(SCHEMA).expect("schema fixture should load")
}

fn decode(blob: &[u8]) -> Decoded {
    unflatten_blob(blob, &schema()).expect("fixture blob should be well formed")
}

fn rows(node: &Node, property: &str) -> Vec<Vec<u64>> {
    node.property(property)
        .and_then(PropertyValue::raw_rows)
        .unwrap_or_else(|| panic!("{property} should be numeric"))
}

#[cfg(test)]
mod board_tests {
    use super::*;

    #[test]
    fn test_board_decodes_without_diagnostics() {
        let decoded = decode(&board_dtb());
        assert!(
            decoded.diagnostics.is_empty(),
            "Unexpected diagnostics: {:?}",
            decoded.diagnostics
        );
        assert_eq!(decoded.phandles.len(), 2, "Both controllers should register");
        assert!(decoded.locations.is_empty());
        assert!(decoded.fixups.is_empty());
    }

    #[test]
    fn test_board_strings_and_flags() {
        let root = decode(&board_dtb()).root;

        assert_eq!(
            root.property("compatible").and_then(PropertyValue::as_strings),
            Some(&["acme,board".to_string(), "acme,soc".to_string()][..])
        );
        assert_eq!(root.prop_string("model"), Some("Acme Board"));

        let intc = root.child("intc@8000000").expect("intc should exist");
        assert_eq!(
            intc.property("interrupt-controller"),
            Some(&PropertyValue::Boolean)
        );

        let aliases = root.child("aliases").expect("aliases should exist");
        assert_eq!(aliases.prop_string("serial0"), Some("/soc/serial@1000"));

        let chosen = root.child("chosen").expect("chosen should exist");
        assert_eq!(chosen.prop_string("bootargs"), Some("console=ttyS0"));
    }

    #[test]
    fn test_board_addresses() {
        let root = decode(&board_dtb()).root;

        let intc = root.child("intc@8000000").unwrap();
        assert_eq!(rows(intc, "reg"), vec![vec![0, 0x800_0000, 0, 0x1_0000]]);

        let soc = root.child("soc").unwrap();
        assert_eq!(rows(soc, "ranges"), vec![vec![0, 0, 0x4000_0000, 0x1000_0000]]);

        let serial = root.find_node("/soc/serial@1000").unwrap();
        assert_eq!(rows(serial, "reg"), vec![vec![0x1000, 0x100]]);
    }

    #[test]
    fn test_board_interrupts_follow_root_interrupt_parent() {
        let root = decode(&board_dtb()).root;

        let gpio = root.child("gpio@9000000").unwrap();
        assert_eq!(rows(gpio, "interrupts"), vec![vec![0, 7, 4]]);

        let serial = root.find_node("/soc/serial").unwrap();
        assert_eq!(rows(serial, "interrupts"), vec![vec![0, 1, 4]]);
        assert_eq!(serial.prop_u32("clock-frequency"), Some(3_686_400));
    }

    #[test]
    fn test_board_gpios_and_untyped_data() {
        let root = decode(&board_dtb()).root;
        let leds = root.find_node("/soc/leds").unwrap();

        assert_eq!(rows(leds, "reset-gpios"), vec![vec![2, 5, 0], vec![2, 6, 1]]);
        // No schema entry: one row of two uint32 cells
        assert_eq!(rows(leds, "vendor,calibration"), vec![vec![1, 2]]);
    }

    #[test]
    fn test_board_serializes_to_json() {
        let root = decode(&board_dtb()).root;
        let serial = root.find_node("/soc/serial@1000").unwrap();

        let json = serde_json::to_value(serial).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "compatible": ["ns16550a"],
                "reg": [[0x1000, 0x100]],
                "interrupts": [[0, 1, 4]],
                "clock-frequency": [[3_686_400]],
                "status": ["okay"]
            })
        );
    }

    #[test]
    fn test_decoding_is_repeatable() {
        let blob = board_dtb();
        let schema = schema();
        let first = unflatten_blob(&blob, &schema).unwrap();
        let second = unflatten_blob(&blob, &schema).unwrap();
        assert_eq!(first.root, second.root);
    }
}

#[cfg(test)]
mod pass_tests {
    use super::*;

    #[test]
    fn test_fixups_without_matching_properties_are_noop() {
        let blob = BlobBuilder::new()
            .begin("")
            .prop("compatible", b"acme,bare\0")
            .begin("cpus")
            .prop_cells("#address-cells", &[1])
            .prop_cells("#size-cells", &[0])
            .begin("cpu@0")
            .prop("device_type", b"cpu\0")
            .prop_cells("clock-latency", &[100_000, 7])
            .end()
            .end()
            .end()
            .finish();

        let schema = schema();
        let fdt = Fdt::new(&blob).unwrap();
        let mut session = DecodeSession::new(&schema);
        let mut root = session.build(&fdt);
        let before = root.clone();

        session.fix_up(&mut root);
        assert_eq!(root, before, "Fixups should not touch unrelated properties");
        assert!(session.finish(root).diagnostics.is_empty());
    }

    #[test]
    fn test_overlay_with_unresolved_references() {
        let ph = u64::from(PH);
        let blob = BlobBuilder::new()
            .begin("")
            .begin("fragment@0")
            .prop_cells("target", &[PH])
            .begin("__overlay__")
            .begin("dev")
            .prop_cells("interrupt-parent", &[PH])
            .prop_cells("interrupts", &[1, 2])
            .prop_cells("clocks", &[PH, 3, PH, 4])
            .end()
            .end()
            .end()
            .begin("__fixups__")
            .prop(
                "intc",
                b"/fragment@0:target:0\0/fragment@0/__overlay__/dev:interrupt-parent:0\0",
            )
            .end()
            .begin("__local_fixups__")
            .begin("fragment@0")
            .begin("__overlay__")
            .begin("dev")
            .prop("clocks", &cells(&[0, 8]))
            .end()
            .end()
            .end()
            .end()
            .end()
            .finish();

        let decoded = decode(&blob);
        assert!(decoded.diagnostics.is_empty());
        assert_eq!(decoded.fixups.len(), 2);
        assert_eq!(decoded.locations.len(), 2);
        assert!(decoded.root.child("__fixups__").is_none());
        assert!(decoded.root.child("__local_fixups__").is_none());

        let dev = decoded.root.find_node("/fragment@0/__overlay__/dev").unwrap();
        assert!(!dev.has_property("interrupt-parent"));
        assert_eq!(rows(dev, "interrupts"), vec![vec![1], vec![2]]);
        assert_eq!(rows(dev, "clocks"), vec![vec![ph, 3], vec![ph, 4]]);
    }

    #[test]
    fn test_anomalies_are_reported_not_fatal() {
        let blob = BlobBuilder::new()
            .begin("")
            .prop("gpio-controller", &[1])
            .prop("clock-frequency", &[0, 1])
            .begin("dev")
            .prop_cells("clocks", &[7, 0])
            .end()
            .end()
            .finish();

        let decoded = decode(&blob);
        assert_eq!(
            decoded.root.property("gpio-controller"),
            Some(&PropertyValue::Raw(vec![1]))
        );
        assert!(decoded.root.property("clock-frequency").is_some());
        assert!(matches!(
            decoded.diagnostics.as_slice(),
            [
                Diagnostic::BooleanWithValue { len: 1, .. },
                Diagnostic::SizeMismatch { len: 2, .. }
            ]
        ));
    }

    #[test]
    fn test_invalid_blob_is_an_error() {
        let mut blob = board_dtb();
        blob[0] = 0;
        assert!(matches!(
            unflatten_blob(&blob, &schema()),
            Err(DtbError::InvalidMagic(_))
        ));
    }
}
