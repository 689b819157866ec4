use super::*;

fn message(source: &str) -> String {
    assemble_err(source).message()
}

#[test]
fn test_syntax_errors() {
    assert_eq!(message(" nop\n"), "code or data not in a section.");
    assert_eq!(message("#section code\n foo\n"), "unknown opcode \"foo\".");
    assert_eq!(message("#section code\n ld q,1\n"), "invalid operands for opcode 'LD'.");
    assert_eq!(message("#section code\nx: nop\nx: nop\n"), "duplicate identifier \"x\".");
    assert_eq!(message("#section code\n#repeat 2\n nop\n"), "missing 'endrepeat'.");
    assert_eq!(message("#section code\n#frobnicate\n"), "unknown directive \"#frobnicate\".");
    assert_eq!(message("#section code\n db \"open\n"), "unterminated string literal.");
    assert_eq!(message("#section code\n db 0x1g\n"), "syntax error in hexadecimal number.");
}

#[test]
fn test_evaluation_errors() {
    assert_eq!(message("#section code\nx equ y+1\ny equ x+1\n db x\n"), "hit circular dependency while evaluating expression.");
    assert_eq!(message("#section code\n db missing\n"), "use of undeclared identifier 'missing'.");
    assert_eq!(message("#section code\n db 1/0\n"), "division by zero.");
    assert_eq!(message("#section code\n dw 0x10000\n"), "value 65536 (0x10000) does not fit into a word.");
    assert_eq!(message("#section code\n dw sizeof(nothing)\n"), "use of undeclared section \"nothing\".");
    assert_eq!(message("#section code\n bit 8,a\n"), "bit index is out of range.");
    assert_eq!(message("#section code\n im 3\n"), "invalid operand for IM instruction.");
    assert_eq!(message("#section code\n rst 0x09\n"), "invalid operand for RST instruction.");
}

#[test]
fn test_unused_circular_constant_is_still_reported() {
    assert_eq!(message("#section code\n nop\nx equ x\n"), "hit circular dependency while evaluating expression.");
}

#[test]
fn test_relative_jump_out_of_range() {
    let err = assemble_err("#section code\n jr far\n ds 200\nfar: nop\n");
    assert_eq!(err.message(), "value 200 (0xc8) does not fit into a byte.");
    assert_eq!(err.location().map(|l| l.line), Some(2));
}

#[test]
fn test_address_over_64k() {
    assert_eq!(message("#section high_0xfff0\n ds 32\n"), "address is over 64K.");
}

#[test]
fn test_ensure_is_checked_at_emission() {
    assemble("#section code\n nop\n#ensure $ == 0x1235\n");
    assert_eq!(message("#section code\n#ensure $ == 0\n"), "expression is false: $ == 0.");
}

#[test]
fn test_unresolvable_reference() {
    let err = assemble_err("#section code\n ds later\nlater: nop\n");
    assert!(matches!(err, AssemblerError::Unresolved(_)), "{:?}", err);
    assert_eq!(err.message(), "unable to resolve address for label \"later\".");
}

#[test]
fn test_errors_carry_file_and_line() {
    let err = assemble_err("#section code\n nop\n\n ld a,300\n");
    assert_eq!(err.to_string(), "test.asm:4: value 300 (0x12c) does not fit into a byte.");
}

#[test]
fn test_repeat_counter_too_large() {
    assert_eq!(message("#section code\n#repeat 0x10000\n nop\n#endrepeat\n"), "repeat counter is too large.");
}

#[test]
fn test_pass_limit_exhausted() {
    let source = "#section a\n ds sizeof(b)\n#section b\n ds sizeof(c)\n#section c\n db 1\n";
    assert_eq!(assemble(source).len(), 3);

    let err = Assembler::new()
        .with_pass_limit(1)
        .assemble_bytes("test.asm", source)
        .unwrap_err();
    assert!(matches!(err, AssemblerError::Unresolved(_)), "{:?}", err);
    assert_eq!(err.message(), "section size is not available in this context.");
    assert_eq!(err.location().map(|l| l.line), Some(2));
}

#[test]
fn test_data_size_changed_between_links() {
    let source = "#section code\n ds baseof(data) & 0x0f\n#section data\n db 1\n";
    let mut program = Program::new();
    zxasm_common::parser::parse_source(&mut program, "test.asm", source).unwrap();

    let project = |data_base: &str| {
        Project::from_json(&format!(
            r#"{{ "files": [ {{ "name": "MAIN", "start": "0x8000", "sections": [
                {{ "name": "code", "base": "0x8000" }}, {{ "name": "data", "base": "{}" }}
            ] }} ] }}"#,
            data_base
        ))
        .unwrap()
    };
    Assembler::new().with_project(project("0x8002")).link(&mut program).unwrap();
    let err = Assembler::new()
        .with_project(project("0x8004"))
        .link(&mut program)
        .unwrap_err();
    assert!(matches!(err, AssemblerError::Internal(_)), "{:?}", err);
    assert_eq!(
        err.message(),
        "internal compiler error: size of data directive changed between passes (2 != 4)."
    );
}
