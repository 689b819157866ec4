use super::*;

/// Length byte followed by the data reversed. Enough to tell raw from
/// compressed bytes in the output.
struct Reverse;

impl Compressor for Reverse {
    fn compression(&self) -> Compression {
        Compression::Zx0
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![data.len() as u8];
        out.extend(data.iter().rev());
        Ok(out)
    }
}

const SOURCE: &str = "#section packed\nsrc: db 1,2,3\n#section code\n ld hl,src\n";

fn project(compression: &str) -> Project {
    Project::from_json(&format!(
        r#"{{ "files": [ {{ "name": "MAIN", "start": "0x8000", "sections": [
            {{ "name": "packed", "base": "0x4000", "compression": "{}" }},
            {{ "name": "code" }}
        ] }} ] }}"#,
        compression
    ))
    .unwrap()
}

#[test]
fn test_compressed_section_keeps_decompressed_addresses() {
    let mut assembler = Assembler::new().with_project(project("zx0"));
    assembler.register_compressor(Box::new(Reverse));
    let output = assembler.assemble("test.asm", SOURCE).unwrap();
    let file = output.get("MAIN").unwrap();
    eprintln!("{}", hex::encode(file.bytes()));
    assert_eq!(hex::encode(file.bytes()), "03030201210040");

    let debug: Vec<_> = file.debug_info().sections().collect();
    assert_eq!(debug[0].name, "packed");
    assert_eq!(debug[0].start, 0x8000);
    assert_eq!(debug[0].base, 0x4000);
    assert_eq!(debug[0].compression, Compression::Zx0);
    assert_eq!(debug[0].uncompressed_size, 3);
    assert_eq!(debug[0].compressed_size, Some(4));
    assert_eq!(debug[1].start, 0x8004);
}

#[test]
fn test_section_after_compressed_one_uses_compressed_size() {
    let source = "#section packed\n ds 10\n#section code\n dw addressof(code), sizeof(packed)\n";
    let mut assembler = Assembler::new().with_project(project("zx0"));
    assembler.register_compressor(Box::new(Reverse));
    let output = assembler.assemble("test.asm", source).unwrap();
    let bytes = output.get("MAIN").unwrap().bytes();
    assert_eq!(bytes.len(), 11 + 4);
    assert_eq!(hex::encode(&bytes[11..]), "0b800b00");
}

#[test]
fn test_missing_codec_is_reported() {
    let err = Assembler::new().with_project(project("zx7")).assemble("test.asm", SOURCE).unwrap_err();
    assert!(matches!(err, AssemblerError::Compression(_)));
    assert_eq!(err.message(), "compression \"zx7\" is not available.");
}
