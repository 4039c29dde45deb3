use elf_writer::{Class, DataRegion, ElfFile, ElfHeader, Encoding, MemSize, Section, Segment};

pub fn header(class: Class, encoding: Encoding) -> ElfHeader {
    ElfHeader {
        class,
        encoding,
        osabi: elf::abi::ELFOSABI_SYSV,
        abi_version: 0,
        e_type: elf::abi::ET_REL,
        e_machine: elf::abi::EM_X86_64,
        e_entry: 0,
        e_flags: 0,
    }
}

pub fn file(class: Class, encoding: Encoding, regions: Vec<DataRegion>) -> ElfFile {
    let mut file = ElfFile::new(header(class, encoding));
    file.regions = regions;
    file
}

pub fn section(index: u16, name: &[u8], data: &[u8]) -> Section {
    Section {
        index,
        name: name.to_vec(),
        sh_type: elf::abi::SHT_PROGBITS,
        flags: 0,
        addr: 0,
        size: data.len() as u64,
        link: 0,
        info: 0,
        addr_align: 1,
        entsize: 0,
        data: data.to_vec(),
    }
}

pub fn load_segment(index: u16, vaddr: u64, align: u64, regions: Vec<DataRegion>) -> Segment {
    Segment {
        index,
        p_type: elf::abi::PT_LOAD,
        flags: elf::abi::PF_R,
        vaddr,
        paddr: vaddr,
        align,
        mem_size: MemSize::Relative(0),
        regions,
    }
}
