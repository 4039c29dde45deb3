mod common;

use common::{file, header, load_segment, section};
use elf_writer::{Class, DataRegion, ElfFile, Encoding, SymbolEntry, SymbolTable};
use object::{Object, ObjectSection, ObjectSymbol};
use rstest::rstest;

#[rstest]
fn empty_file_header_fields() {
    let file = file(
        Class::Elf64,
        Encoding::Lsb,
        vec![
            DataRegion::ElfHeader,
            DataRegion::SegmentHeaders,
            DataRegion::SectionHeaders,
        ],
    );
    let layout = file.layout().unwrap();
    let bytes = layout.bytes();

    assert_eq!(bytes.len() as u64, layout.size());
    assert_eq!(&bytes[0..4], &[0x7f, b'E', b'L', b'F']);
    assert_eq!(bytes[4], elf::abi::ELFCLASS64);
    assert_eq!(bytes[5], elf::abi::ELFDATA2LSB);
    assert_eq!(bytes[6], elf::abi::EV_CURRENT);
    // e_shoff, e_ehsize, e_shentsize, e_shnum, e_shstrndx.
    assert_eq!(u64::from_le_bytes(bytes[40..48].try_into().unwrap()), 64);
    assert_eq!(u16::from_le_bytes(bytes[52..54].try_into().unwrap()), 64);
    assert_eq!(u16::from_le_bytes(bytes[58..60].try_into().unwrap()), 64);
    assert_eq!(u16::from_le_bytes(bytes[60..62].try_into().unwrap()), 1);
    assert_eq!(u16::from_le_bytes(bytes[62..64].try_into().unwrap()), 0);
    // The null section header is all zeros.
    assert!(bytes[64..128].iter().all(|&b| b == 0));
}

#[rstest]
fn big_endian_header_fields() {
    let file = file(
        Class::Elf64,
        Encoding::Msb,
        vec![DataRegion::ElfHeader, DataRegion::SectionHeaders],
    );
    let bytes = file.layout().unwrap().bytes();
    assert_eq!(bytes[5], elf::abi::ELFDATA2MSB);
    assert_eq!(&bytes[16..18], &elf::abi::ET_REL.to_be_bytes());
    assert_eq!(&bytes[18..20], &elf::abi::EM_X86_64.to_be_bytes());
}

#[rstest]
fn phdr_field_order_differs_between_classes() {
    let regions = |vaddr| {
        vec![
            DataRegion::ElfHeader,
            DataRegion::SegmentHeaders,
            DataRegion::Segment(load_segment(0, vaddr, 1, vec![DataRegion::Raw(vec![7u8; 4])])),
        ]
    };

    // 32-bit: p_flags is the seventh field.
    let bytes = file(Class::Elf32, Encoding::Lsb, regions(0x1234))
        .layout()
        .unwrap()
        .bytes();
    let phdr = &bytes[52..84];
    assert_eq!(
        u32::from_le_bytes(phdr[0..4].try_into().unwrap()),
        elf::abi::PT_LOAD
    );
    assert_eq!(u32::from_le_bytes(phdr[4..8].try_into().unwrap()), 84);
    assert_eq!(u32::from_le_bytes(phdr[8..12].try_into().unwrap()), 0x1234);
    assert_eq!(u32::from_le_bytes(phdr[16..20].try_into().unwrap()), 4);
    assert_eq!(
        u32::from_le_bytes(phdr[24..28].try_into().unwrap()),
        elf::abi::PF_R
    );

    // 64-bit: p_flags comes right after p_type.
    let bytes = file(Class::Elf64, Encoding::Lsb, regions(0x1234))
        .layout()
        .unwrap()
        .bytes();
    let phdr = &bytes[64..120];
    assert_eq!(
        u32::from_le_bytes(phdr[0..4].try_into().unwrap()),
        elf::abi::PT_LOAD
    );
    assert_eq!(
        u32::from_le_bytes(phdr[4..8].try_into().unwrap()),
        elf::abi::PF_R
    );
    assert_eq!(u64::from_le_bytes(phdr[8..16].try_into().unwrap()), 120);
}

#[rstest]
fn empty_section_offset_is_nudged_into_congruence() {
    let mut bss = section(1, b".bss", b"");
    bss.sh_type = elf::abi::SHT_NOBITS;
    bss.size = 0x20;
    bss.addr = 0x2000;
    bss.addr_align = 16;
    let file = file(
        Class::Elf64,
        Encoding::Lsb,
        vec![
            DataRegion::ElfHeader,
            DataRegion::Raw(b"abc".to_vec()),
            DataRegion::Section(bss),
            DataRegion::SectionHeaders,
        ],
    );
    let layout = file.layout().unwrap();

    // The planner accounts no bytes and no padding for the empty section...
    let shdr = layout.shdr(1).unwrap();
    assert_eq!(shdr.offset, 67);
    // ...but the recorded sh_offset agrees with the address modulo 16.
    assert_eq!(shdr.file_offset(), 80);

    let bytes = layout.bytes();
    let entry = &bytes[layout.shdr_table_offset() as usize + 64..];
    assert_eq!(u64::from_le_bytes(entry[24..32].try_into().unwrap()), 80);
    assert_eq!(u64::from_le_bytes(entry[32..40].try_into().unwrap()), 0x20);
}

#[rstest]
fn sections_outside_segments_are_zero_padded() {
    let mut data = section(1, b".data", b"abc");
    data.addr_align = 16;
    let file = file(
        Class::Elf64,
        Encoding::Lsb,
        vec![
            DataRegion::ElfHeader,
            DataRegion::Raw(b"x".to_vec()),
            DataRegion::Section(data),
        ],
    );
    let layout = file.layout().unwrap();
    let bytes = layout.bytes();
    assert_eq!(bytes.len(), 83);
    assert!(bytes[65..80].iter().all(|&b| b == 0));
    assert_eq!(&bytes[80..83], b"abc");
}

fn relocatable_fixture(class: Class, encoding: Encoding, e_machine: u16) -> ElfFile {
    let mut text = section(1, b".text", b"\xc3\x90\x90\x90");
    text.flags = (elf::abi::SHF_ALLOC | elf::abi::SHF_EXECINSTR) as u64;
    text.addr_align = 16;
    let symtab = SymbolTable {
        index: 2,
        entries: vec![
            SymbolEntry {
                name: Vec::new(),
                binding: 0,
                sym_type: 0,
                other: 0,
                shndx: 0,
                value: 0,
                size: 0,
            },
            SymbolEntry {
                name: b"main".to_vec(),
                binding: elf::abi::STB_GLOBAL,
                sym_type: elf::abi::STT_FUNC,
                other: 0,
                shndx: 1,
                value: 0,
                size: 4,
            },
        ],
        local_count: 1,
    };
    let mut file = ElfFile::new(header(class, encoding));
    file.header.e_machine = e_machine;
    file.regions = vec![
        DataRegion::ElfHeader,
        DataRegion::Section(text),
        DataRegion::Symtab(symtab),
        DataRegion::Strtab { index: 3 },
        DataRegion::SectionNameTable { index: 4 },
        DataRegion::SectionHeaders,
    ];
    file
}

#[rstest]
#[case(Class::Elf64, Encoding::Lsb, elf::abi::EM_X86_64)]
#[case(Class::Elf32, Encoding::Msb, elf::abi::EM_PPC)]
fn emitted_images_parse_back(
    #[case] class: Class,
    #[case] encoding: Encoding,
    #[case] e_machine: u16,
) {
    let file = relocatable_fixture(class, encoding, e_machine);
    let bytes = file.layout().unwrap().bytes();

    let parsed = object::File::parse(bytes.as_slice()).unwrap();
    assert_eq!(parsed.is_64(), class == Class::Elf64);
    assert_eq!(parsed.is_little_endian(), encoding == Encoding::Lsb);

    let text = parsed.section_by_name(".text").unwrap();
    assert_eq!(text.data().unwrap(), b"\xc3\x90\x90\x90");

    let main = parsed
        .symbols()
        .find(|symbol| symbol.name() == Ok("main"))
        .unwrap();
    assert_eq!(main.address(), 0);
    assert_eq!(main.size(), 4);
    assert!(main.is_global());
}

#[rstest]
fn image_length_always_matches_the_layout() {
    let file = relocatable_fixture(Class::Elf64, Encoding::Lsb, elf::abi::EM_X86_64);
    let layout = file.layout().unwrap();
    assert_eq!(layout.bytes().len() as u64, layout.size());
}
