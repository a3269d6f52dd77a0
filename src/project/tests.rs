use crate::arch::ArchName;
use crate::project::{EmulatorConfig, Program, Project};

#[test]
fn project_read_defaults() {
    let json = r#"{
        "programs": {
            "sample": {
                "arch": "x86_64",
                "export": "sample.export.json",
                "emulator": { "heap_slack": 16, "max_buffer_size": 4096 }
            },
            "bare": {}
        }
    }"#;
    let project = Project::from_reader(json.as_bytes()).unwrap();

    let sample = project.program("sample").unwrap();
    assert_eq!(sample.as_name(), Some("sample"));
    assert_eq!(sample.arch(), Some(ArchName::X86_64));
    assert_eq!(sample.as_export_path().as_str(), "sample.export.json");
    assert_eq!(sample.emulator().heap_slack, 16);
    assert_eq!(sample.emulator().max_buffer_size, 4096);
    assert_eq!(sample.emulator().stack_pointer, EmulatorConfig::default().stack_pointer);

    let bare = project.program("bare").unwrap();
    assert_eq!(bare.arch(), None);
    assert_eq!(bare.as_export_path().as_str(), "export.json");
    assert_eq!(bare.emulator(), &EmulatorConfig::default());
}

#[test]
fn program_override() {
    let mut base = Program::default();
    base.set_arch(ArchName::X86);
    base.set_export_path("base.json");

    let mut cli = Program::default();
    cli.set_arch(ArchName::X86_64);

    let merged = base.apply_override(&cli, false);
    assert_eq!(merged.arch(), Some(ArchName::X86_64));
    assert_eq!(merged.as_export_path().as_str(), "base.json");

    cli.set_export_path("cli.json");
    let merged = base.apply_override(&cli, true);
    assert_eq!(merged.as_export_path().as_str(), "cli.json");
}
