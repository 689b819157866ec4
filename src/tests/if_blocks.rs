use super::*;

#[test]
fn test_selects_branch_by_constant() {
    let source = "#section code\nflag equ 1\n#if flag\n db 1\n#else\n db 2\n#endif\n";
    assert_eq!(hex::encode(assemble(source)), "01");
    let source = "#section code\nflag equ 0\n#if flag\n db 1\n#else\n db 2\n#endif\n";
    assert_eq!(hex::encode(assemble(source)), "02");
}

#[test]
fn test_conditional_labels() {
    let source = "#section code\n\
mode equ 2\n\
#if mode == 1\n\
entry: nop\n\
#else\n\
 nop\n\
entry: halt\n\
#endif\n\
 dw entry\n";
    let bytes = assemble(source);
    assert_eq!(hex::encode(&bytes), "00763512");
}

#[test]
fn test_conditional_constants() {
    let source = "#section code\n\
#if 0\n\
size equ 1\n\
#else\n\
size equ 4\n\
#endif\n\
 ds size\n";
    assert_eq!(hex::encode(assemble(source)), "00000000");
}

#[test]
fn test_condition_on_label_in_later_section() {
    let source = "#section code\n\
#if message == 0x8000\n\
 db 1\n\
#else\n\
 db 2\n\
#endif\n\
#section data_0x8000\n\
message: db 0\n";
    assert_eq!(hex::encode(assemble(source)), "0100");
}

#[test]
fn test_if_inside_repeat() {
    let source = "#section code\n#repeat 4, k\n#if k & 1\n db 0xff\n#else\n db k\n#endif\n#endrepeat\n";
    assert_eq!(hex::encode(assemble(source)), "00ff02ff");
}

#[test]
fn test_condition_depending_on_own_size_never_converges() {
    let source = "#section code\nstart:\n#if end - start > 1\n nop\n#endif\nend: nop\n";
    let err = assemble_err(source);
    assert!(matches!(err, AssemblerError::Unresolved(_)), "{:?}", err);
}
