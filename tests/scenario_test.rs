//! Tests for TOML-described simulated systems

use memedit::process::{ModuleDirectory, ProcessDirectory};
use memedit::system::{Scenario, ScenarioError};
use memedit::{Address, MemoryAccessor, ScalarType, ScalarValue};
use std::sync::Arc;

const SCENARIO: &str = r#"
[[process]]
pid = 4
name = "System"

[[process]]
pid = 4242
name = "game.exe"
parent_pid = 900
threads = 12

[[process.module]]
name = "game.exe"
base = 0x140000000
size = 0x2000

[[process.module]]
name = "physics.dll"
base = 0x7ff800000000
size = 0x1000

[[process.region]]
base = 0x140001000
bytes = "0020000000000000"
size = 0x100

[[process.region]]
base = 0x2000
size = 0x40

[[process]]
pid = 666
name = "anticheat.exe"
protected = true
"#;

#[cfg(test)]
mod scenario_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_processes_and_modules_listed() {
        let system = Arc::new(Scenario::from_toml_str(SCENARIO).unwrap().build().unwrap());

        let processes = ProcessDirectory::new(system.clone()).processes().unwrap();
        let names: Vec<String> = processes.iter().map(|p| p.name.to_string()).collect();
        assert_eq!(names, vec!["System", "game.exe", "anticheat.exe"]);
        assert_eq!(processes[1].parent_pid, 900);
        assert_eq!(processes[1].thread_count, 12);

        let base = ModuleDirectory::new(system)
            .find_module_base(4242, "physics.dll")
            .unwrap();
        assert_eq!(base, Address::new(0x7ff8_0000_0000));
    }

    #[test]
    fn test_regions_are_mapped() {
        let system = Arc::new(Scenario::from_toml_str(SCENARIO).unwrap().build().unwrap());
        let accessor = MemoryAccessor::open(system, 4242).unwrap();

        let location = accessor
            .location(
                ScalarType::U32,
                Address::new(0x1_4000_1000),
                Some(vec![0x0, 0x10]),
            )
            .unwrap();
        location.write(99u32).unwrap();
        assert_eq!(location.read().unwrap(), ScalarValue::U32(99));
        assert_eq!(accessor.read::<u32>(Address::new(0x2010)).unwrap(), 99);
    }

    #[test]
    fn test_protected_process_denies_open() {
        let system = Arc::new(Scenario::from_toml_str(SCENARIO).unwrap().build().unwrap());
        let err = MemoryAccessor::open(system, 666).unwrap_err();
        assert_eq!(err.os_code(), Some(5));
    }

    #[test]
    fn test_nested_regions_read_consistently() {
        let text = r#"
[[process]]
pid = 7
name = "game.exe"

[[process.region]]
base = 0x1000
bytes = "aa"
size = 0x100

[[process.region]]
base = 0x1010
bytes = "0100000002000000"
size = 0x10
"#;
        let system = Arc::new(Scenario::from_toml_str(text).unwrap().build().unwrap());
        let accessor = MemoryAccessor::open(system, 7).unwrap();

        assert_eq!(accessor.read::<u32>(Address::new(0x1080)).unwrap(), 0);
        assert_eq!(accessor.read::<u32>(Address::new(0x1014)).unwrap(), 2);
        assert_eq!(accessor.read::<u8>(Address::new(0x1000)).unwrap(), 0xAA);

        let bytes = accessor.read_bytes(Address::new(0x1000), 0x100).unwrap();
        assert_eq!(bytes.len(), 0x100);
        assert_eq!(&bytes[0x10..0x18], &[1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(
            accessor.read::<u32>(Address::new(0x1080)).unwrap(),
            u32::from_le_bytes([bytes[0x80], bytes[0x81], bytes[0x82], bytes[0x83]])
        );
    }

    #[test]
    fn test_bad_hex_reports_region() {
        let text = "[[process]]\npid = 1\nname = \"a\"\n[[process.region]]\nbase = 0x10\nbytes = \"zz\"\n";
        let err = Scenario::from_toml_str(text).unwrap().build().unwrap_err();
        assert!(matches!(err, ScenarioError::Hex { pid: 1, base: 0x10, .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scenario.toml");
        std::fs::write(&path, SCENARIO).unwrap();
        let scenario = Scenario::from_file(&path).unwrap();
        assert_eq!(scenario.processes.len(), 3);

        let missing = Scenario::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ScenarioError::Io(_)));
    }
}
