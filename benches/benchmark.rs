use criterion::{Criterion, criterion_group, criterion_main};
use elf_writer::{
    Class, DataRegion, ElfFile, ElfHeader, Encoding, MemSize, Section, Segment, SymbolEntry,
    SymbolTable,
};

fn synthetic_file(section_count: u16) -> ElfFile {
    let mut file = ElfFile::new(ElfHeader {
        class: Class::Elf64,
        encoding: Encoding::Lsb,
        osabi: elf::abi::ELFOSABI_SYSV,
        abi_version: 0,
        e_type: elf::abi::ET_DYN,
        e_machine: elf::abi::EM_X86_64,
        e_entry: 0,
        e_flags: 0,
    });
    file.regions.push(DataRegion::ElfHeader);
    file.regions.push(DataRegion::SegmentHeaders);

    let mut entries = vec![SymbolEntry {
        name: Vec::new(),
        binding: 0,
        sym_type: 0,
        other: 0,
        shndx: 0,
        value: 0,
        size: 0,
    }];
    for index in 1..section_count {
        file.regions.push(DataRegion::Section(Section {
            index,
            name: format!(".data.{index}").into_bytes(),
            sh_type: elf::abi::SHT_PROGBITS,
            flags: 0,
            addr: 0,
            size: 256,
            link: 0,
            info: 0,
            addr_align: 16,
            entsize: 0,
            data: vec![index as u8; 256],
        }));
        entries.push(SymbolEntry {
            name: format!("object_{index}").into_bytes(),
            binding: elf::abi::STB_GLOBAL,
            sym_type: elf::abi::STT_OBJECT,
            other: 0,
            shndx: index,
            value: 0,
            size: 256,
        });
    }
    file.regions.push(DataRegion::Segment(Segment {
        index: 0,
        p_type: elf::abi::PT_LOAD,
        flags: elf::abi::PF_R,
        vaddr: 0,
        paddr: 0,
        align: 1,
        mem_size: MemSize::Relative(0),
        regions: vec![DataRegion::Raw(vec![0u8; 0x1000])],
    }));
    file.regions.push(DataRegion::Symtab(SymbolTable {
        index: section_count,
        entries,
        local_count: 1,
    }));
    file.regions.push(DataRegion::Strtab {
        index: section_count + 1,
    });
    file.regions.push(DataRegion::SectionNameTable {
        index: section_count + 2,
    });
    file.regions.push(DataRegion::SectionHeaders);
    file
}

fn layout_benchmark(c: &mut Criterion) {
    let file = synthetic_file(128);
    c.bench_function("elf_writer:layout", |b| {
        b.iter(|| file.layout().unwrap());
    });
    c.bench_function("elf_writer:bytes", |b| {
        let layout = file.layout().unwrap();
        b.iter(|| layout.bytes());
    });
}

criterion_group!(benches, layout_benchmark);
criterion_main!(benches);
