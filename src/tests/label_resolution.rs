use super::*;

#[test]
fn test_forward_jump() {
    // JP end at 0x1234, NOP at 0x1237, end at 0x1238
    let bytes = assemble("#section code\n jp end\n nop\nend: ret\n");
    assert_eq!(hex::encode(&bytes), "c3381200c9");
}

#[test]
fn test_relative_jumps() {
    let bytes = assemble("#section code\nloop: djnz loop\n jr forward\n nop\nforward: ret\n");
    assert_eq!(hex::encode(&bytes), "10fe180100c9");
}

#[test]
fn test_local_labels_are_scoped_by_global_label() {
    let source = "#section code\n\
first:\n\
@@again: jr @@again\n\
second:\n\
@@again: jr first@@again\n";
    let bytes = assemble(source);
    assert_eq!(hex::encode(&bytes), "18fe18fc");
}

#[test]
fn test_equ_constants_may_be_used_before_definition() {
    let bytes = assemble("#section code\n ld a,value\n ld bc,value*256\nvalue equ 5\n");
    assert_eq!(hex::encode(&bytes), "3e05010005");
}

#[test]
fn test_equ_dollar_is_bound_to_its_position() {
    let bytes = assemble("#section code\n nop\nhere equ $\n dw here\n dw $\n");
    assert_eq!(hex::encode(&bytes), "0035123712");
}

#[test]
fn test_equal_sign_defines_constant() {
    let bytes = assemble("#section code\nsize = 3\n ds size, 0xaa\n");
    assert_eq!(hex::encode(&bytes), "aaaaaa");
}

#[test]
fn test_forward_reference_across_sections() {
    // data follows code, so its labels depend on the size of code
    let source = "#section code\n ld hl,message\n ret\n#section data\nmessage: db \"hi\"\n";
    let bytes = assemble(source);
    assert_eq!(hex::encode(&bytes), "213812c96869");
}

#[test]
fn test_section_queries() {
    let source = "#section code\n dw addressof(data), sizeof(data)\n#section data\n db 1,2,3\n";
    let bytes = assemble(source);
    assert_eq!(hex::encode(&bytes), "38120300010203");
}

#[test]
fn test_linking_twice_is_idempotent() {
    let source = "#section code\nstart: jp end\n#repeat 2\nitem: dw item\n#endrepeat\nend: jr start\n";
    let mut program = Program::new();
    zxasm_common::parser::parse_source(&mut program, "test.asm", source).unwrap();

    let assembler = Assembler::new();
    let first = assembler.link(&mut program).unwrap();
    let second = assembler.link(&mut program).unwrap();
    eprintln!("{}", hex::encode(first.files()[0].bytes()));
    assert_eq!(first.files()[0].bytes(), second.files()[0].bytes());
    assert_eq!(hex::encode(first.files()[0].bytes()), "c33b123712391218f7");
}

#[test]
fn test_failed_repeat_iteration_rewinds_label_instances() {
    // the second iteration waits on the data section, which reads the first instance
    let source = "#section code\n#repeat 2, i\nlbl: db i == 1 ? (addressof(data_0x1236) & 0xff) : 0\n#endrepeat\n#section data_0x1236\n dw lbl\n";
    assert_eq!(hex::encode(assemble(source)), "00363412");
}

#[test]
fn test_repeat_labels_seen_from_later_section() {
    let source = "#section code\n#repeat 2, i\nlbl: db i\n#endrepeat\n#section data_0x1236\n dw lbl\n";
    assert_eq!(hex::encode(assemble(source)), "00013412");
}
