use super::*;

const TWO_SECTIONS: &str = "#section code\n db 1,2,3\n#section data\n db 4\n";

#[test]
fn test_file_start_places_sections_upward() {
    let project = r#"{ "files": [ { "name": "game", "start": "0x8000", "sections": [
        { "name": "code" },
        { "name": "data", "alignment": 256 }
    ] } ] }"#;
    let output = link_with(project, TWO_SECTIONS).unwrap();
    let file = output.get("game").unwrap();
    assert_eq!(file.load_address(), 0x8000);
    assert_eq!(file.len(), 0x101);
    assert_eq!(&file.bytes()[..3], &[1, 2, 3]);
    assert!(file.bytes()[3..0x100].iter().all(|&b| b == 0));
    assert_eq!(file.bytes()[0x100], 4);
}

#[test]
fn test_file_until_places_sections_downward() {
    let project = r#"{ "files": [ { "name": "top", "until": "0xc000", "sections": [
        { "name": "code" },
        { "name": "data" }
    ] } ] }"#;
    let output = link_with(project, TWO_SECTIONS).unwrap();
    let file = output.get("top").unwrap();
    eprintln!("{}", hex::encode(file.bytes()));
    assert_eq!(file.load_address(), 0xbffc);
    assert_eq!(hex::encode(file.bytes()), "01020304");
}

#[test]
fn test_base_differs_from_file_offset() {
    let source = "#section code\nentry: jp entry\n";
    let project = r#"{ "files": [ { "name": "rom", "start": 0, "sections": [
        { "name": "code", "base": "0x4000", "file_offset": "auto" }
    ] } ] }"#;
    let output = link_with(project, source).unwrap();
    let file = output.get("rom").unwrap();
    assert_eq!(file.load_address(), 0);
    assert_eq!(hex::encode(file.bytes()), "c30040");
    let debug: Vec<_> = file.debug_info().sections().collect();
    assert_eq!(debug[0].start, 0);
    assert_eq!(debug[0].base, 0x4000);
}

#[test]
fn test_sections_hang_below_anchor() {
    let project = r#"{ "files": [ { "name": "MAIN", "sections": [
        { "name": "code" },
        { "name": "data", "base": "0x9000" }
    ] } ] }"#;
    let output = link_with(project, TWO_SECTIONS).unwrap();
    let file = output.get("MAIN").unwrap();
    assert_eq!(file.load_address(), 0x8ffd);
    assert_eq!(hex::encode(file.bytes()), "01020304");
}

#[test]
fn test_project_expressions_use_section_queries() {
    let project = r#"{ "files": [
        { "name": "first", "start": "0x6000", "sections": [ { "name": "code" } ] },
        { "name": "second", "start": "addressof(code) + sizeof(code)", "sections": [ { "name": "data" } ] }
    ] }"#;
    let output = link_with(project, TWO_SECTIONS).unwrap();
    assert_eq!(output.len(), 2);
    assert_eq!(output.get("second").unwrap().load_address(), 0x6003);
}

#[test]
fn test_gaps_between_fixed_sections_are_padded() {
    let project = r#"{ "files": [ { "name": "MAIN", "sections": [
        { "name": "code", "base": "0x100", "file_offset": "0x100" },
        { "name": "data", "base": "0x108", "file_offset": "0x108" }
    ] } ] }"#;
    let output = link_with(project, TWO_SECTIONS).unwrap();
    let file = output.get("MAIN").unwrap();
    assert_eq!(hex::encode(file.bytes()), "010203000000000004");
}

#[test]
fn test_overlapping_sections() {
    let project = r#"{ "files": [ { "name": "MAIN", "sections": [
        { "name": "code", "base": "0x100", "file_offset": "0x100" },
        { "name": "data", "base": "0x101", "file_offset": "0x101" }
    ] } ] }"#;
    let err = link_with(project, TWO_SECTIONS).unwrap_err();
    assert_eq!(err.message(), "section \"data\" is overlapping with previous section in file \"MAIN\".");
}

#[test]
fn test_section_out_of_bounds() {
    let project = r#"{ "files": [ { "name": "MAIN", "start": "0x8000", "until": "0x8002", "sections": [
        { "name": "code" }, { "name": "data" }
    ] } ] }"#;
    let err = link_with(project, TWO_SECTIONS).unwrap_err();
    assert_eq!(err.message(), "section \"code\" is out of bounds in file \"MAIN\".");
}

#[test]
fn test_project_errors() {
    let cases = [
        (
            r#"{ "files": [ { "name": "A", "start": 0 }, { "name": "A", "start": 0 } ] }"#,
            "duplicate file name \"A\".",
        ),
        (
            r#"{ "files": [ { "name": "A", "start": 0, "sections": [ { "name": "code" }, { "name": "code" } ] } ] }"#,
            "section \"code\" is referenced multiple times for file \"A\".",
        ),
        (
            r#"{ "files": [ { "name": "A", "start": 0, "sections": [ { "name": "code" } ] },
                            { "name": "B", "start": 0, "sections": [ { "name": "code" } ] } ] }"#,
            "section \"code\" is used by more than one file.",
        ),
        (
            r#"{ "files": [ { "name": "A", "sections": [ { "name": "code", "file_offset": 16 } ] } ] }"#,
            "section \"code\" has file offset without base address.",
        ),
        (
            r#"{ "files": [ { "name": "A", "start": 0, "sections": [ { "name": "code", "alignment": 0 } ] } ] }"#,
            "section \"code\" has invalid alignment in file \"A\".",
        ),
        (
            r#"{ "files": [ { "name": "A", "sections": [ { "name": "code", "base": "0x8001", "alignment": 256 } ] } ] }"#,
            "conflicting base and alignment for section \"code\" in file \"A\".",
        ),
        (
            r#"{ "files": [ { "name": "A", "start": 16, "until": 16 } ] }"#,
            "file \"A\" has invalid bounds.",
        ),
    ];
    for (project, expected) in cases {
        let err = link_with(project, TWO_SECTIONS).unwrap_err();
        assert_eq!(err.message(), expected, "{}", project);
    }
}

#[test]
fn test_file_without_anchor_is_rejected() {
    let project = r#"{ "files": [ { "name": "A", "sections": [ { "name": "code" } ] } ] }"#;
    let err = link_with(project, TWO_SECTIONS).unwrap_err();
    assert!(err.message().starts_with("unable to resolve addresses in file \"A\""));
}

#[test]
fn test_upper_section_below_address_zero() {
    let project = r#"{ "files": [ { "name": "low", "until": 2, "sections": [
        { "name": "code" }, { "name": "data" }
    ] } ] }"#;
    let err = link_with(project, TWO_SECTIONS).unwrap_err();
    assert_eq!(err.message(), "section \"code\" is out of bounds in file \"low\".");
}
