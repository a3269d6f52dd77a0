use crate::memory::{Memory, Segment, DEFAULT_MAX_TRANSFER, PAGE_SIZE};

fn sample() -> Memory {
    let mut text = vec![0; 0x9000];
    text[0x150..0x153].copy_from_slice(b"\x55\x8B\xEC");
    text[0x25E0..0x25E3].copy_from_slice(b"\x5F\x5E\xC3");

    let mut data = vec![0; 0x200];
    data[..11].copy_from_slice(b"Idmmn!Vnsme");
    data[0x120..0x126].copy_from_slice(b"`QFBWF");

    Memory::new(vec![
        Segment::new(".text", 0x0040_1000, 0x9000, Some(text)),
        Segment::new(".rdata", 0x0040_A000, 0x2000, None),
        Segment::new(".data", 0x0040_C000, 0x3000, Some(data)),
    ])
}

#[test]
fn memory_unmapped_reads_zero() {
    let m = sample();

    assert_eq!(m.read(0x0012_1000, 10), vec![0; 10]);
}

#[test]
fn memory_cross_page() {
    let mut m = sample();

    m.write(0x0012_1FFB, b"helloworld");
    assert_eq!(m.read(0x0012_1FFB, 10), b"helloworld".to_vec());
    assert_eq!(m.read(0x0012_1FFB + 10, 10), vec![0; 10]);
    assert_eq!(m.read(0x0012_1FFB + 5, 10), b"world\0\0\0\0\0".to_vec());
}

#[test]
fn memory_segment_data() {
    let m = sample();

    assert_eq!(m.read(0x0040_C000, 11), b"Idmmn!Vnsme".to_vec());
    assert_eq!(m.read(0x0040_1150, 3), b"\x55\x8B\xEC".to_vec());
}

#[test]
fn memory_write_seeds_from_segment() {
    let mut m = sample();

    m.write(0x0040_C005, b"?");
    assert_eq!(m.read(0x0040_C000, 11), b"Idmmn?Vnsme".to_vec());
}

#[test]
fn memory_display() {
    let mut m = sample();
    m.write(0x0012_1FFB, b"helloworld");

    assert_eq!(
        m.to_string(),
        "Base Address             Address Range            Size\n\
         0x00121000               0x00121000 - 0x00123000  8192\n\
         0x00401000               0x00401000 - 0x0040F000  57344\n"
    );
}

#[test]
fn memory_display_lists_heap() {
    let mut m = sample();
    m.alloc(0x10);

    assert_eq!(
        m.to_string(),
        "Base Address             Address Range            Size\n\
         0x00401000               0x00401000 - 0x0040F000  57344\n\
         0x02000000               0x02000000 - 0x02001000  4096\n"
    );

    let big = m.alloc(PAGE_SIZE * 2);
    assert_eq!(m.mapped_ranges().last(), Some(&(0x0200_0000, 0x0200_3000)));
    assert_eq!(m.find_in_heap(b"x"), None);
    m.write(big + 1, b"x");
    assert_eq!(m.find_in_heap(b"x"), Some(big + 1));
}

#[test]
fn memory_find() {
    let mut m = sample();
    m.write(0x0012_1FFB, b"helloworld");

    assert_eq!(m.find(b"helloworld", Some(0x0001_1050), None), Some(0x0012_1FFB));
    assert_eq!(m.find(b"helloworld", None, None), Some(0x0012_1FFB));
    assert_eq!(m.find(b"helloworld", Some(0x0012_1FFC), None), None);
    assert_eq!(m.find(b"helloworld", None, Some(0x10)), None);
    assert_eq!(m.find(b"helloworld", Some(0x0001_1050), Some(0x0012_1FFB)), None);
    assert_eq!(m.find(b"helloworld", Some(0x0001_1050), Some(0x0012_2000)), None);
    assert_eq!(m.find(b"helloworld", Some(0x0001_1050), Some(0x0012_2100)), Some(0x0012_1FFB));
    assert_eq!(m.find(b"`QFBWF", None, None), Some(0x0040_C120));
    assert_eq!(m.find(b"Idmmn!Vnsme", None, None), Some(0x0040_C000));
    assert_eq!(m.find(b"\x5F\x5E\xC3", Some(0x0040_35BD), None), Some(0x0040_35E0));
}

#[test]
fn memory_find_single_byte() {
    let mut m = sample();
    m.write(0x0012_1FFB, b"helloworld");

    assert_eq!(m.find(b"h", Some(0x0001_1050), None), Some(0x0012_1FFB));
    assert_eq!(m.find(b"h", Some(0x0001_1050), Some(0x0012_1FFB)), None);
    assert_eq!(m.find(b"h", Some(0x0001_1050), Some(0x0012_1FFC)), Some(0x0012_1FFB));
    assert_eq!(m.find(b"o", Some(0x0001_1050), None), Some(0x0012_1FFF));
}

#[test]
fn memory_find_in_segment() {
    let m = sample();

    assert_eq!(m.find_in_segment(b"Idmmn!Vnsme", ".data"), Some(0x0040_C000));
    assert_eq!(m.find_in_segment(b"Idmmn!Vnsme", ".text"), None);
    assert_eq!(m.find_in_segment(b"Idmmn!Vnsme", ".nope"), None);
}

#[test]
fn memory_alloc() {
    let mut m = sample();
    let base = m.heap_base();
    let slack = m.heap_slack();

    let first = m.alloc(10);
    assert_eq!(first, base);

    let second = m.alloc(20);
    assert_eq!(second, base + 10 + slack);

    m.write(second, b"im in the heap!");
    assert_eq!(m.read(second, 15), b"im in the heap!".to_vec());
    assert_eq!(m.find_in_heap(b"the heap!"), Some(second + 6));

    m.write(second, b"helloworld");
    assert_eq!(m.find_in_heap(b"helloworld"), Some(second));
}

#[test]
fn memory_alloc_zero() {
    let mut m = sample();
    let base = m.heap_base();

    assert_eq!(m.alloc(0), base);
    assert_eq!(m.alloc(0), base);
    assert_eq!(m.find_in_heap(b"x"), None);
}

#[test]
fn memory_realloc() {
    let mut m = sample();
    let slack = m.heap_slack();

    let first = m.alloc(10);
    let second = m.alloc(20);
    m.write(second, b"helloworld");

    assert_eq!(m.realloc(first, 40), first);
    assert_eq!(m.realloc(first, PAGE_SIZE * 5), second + 20 + slack);
    assert_eq!(m.realloc(second, 40), second);

    let moved = m.realloc(second, PAGE_SIZE * 6);
    assert_ne!(moved, second);
    assert_eq!(m.read(moved, 10), b"helloworld".to_vec());
}

#[test]
fn memory_realloc_huge_block() {
    let mut m = sample();
    m.set_max_transfer(0x100);

    let first = m.alloc(u64::MAX / 4);
    let second = m.alloc(0x10);
    m.write(first, b"hello");

    let moved = m.realloc(first, u64::MAX / 2);
    assert!(moved > second);
    assert_eq!(m.read(moved, 5), b"hello".to_vec());
}

#[test]
fn memory_bounded() {
    let mut m = Memory::default();

    assert_eq!(m.max_transfer(), DEFAULT_MAX_TRANSFER);
    assert_eq!(m.bounded(0x20), 0x20);
    assert_eq!(m.bounded(u64::MAX), DEFAULT_MAX_TRANSFER as usize);

    m.set_max_transfer(0x10);
    assert_eq!(m.bounded(0x20), 0x10);
}

#[test]
fn memory_realloc_unknown() {
    let mut m = sample();
    let base = m.heap_base();

    assert_eq!(m.realloc(0x1234, 8), base);
    assert_eq!(m.heap().size_of(base), Some(8));
}

#[test]
fn memory_heap_above_segments() {
    let m = Memory::with_heap(
        vec![Segment::new("big", 0x0100_0000, 0x0180_0010, None)],
        0x0200_0000,
        0x100,
    );

    assert_eq!(m.heap_base(), 0x0280_1000);
}

#[test]
fn memory_ints() {
    let mut m = Memory::default();

    m.write_int(0x1000, 0x1122_3344, 4);
    assert_eq!(m.read(0x1000, 4), vec![0x44, 0x33, 0x22, 0x11]);
    assert_eq!(m.read_int(0x1000, 2), 0x3344);
    assert_eq!(m.read_int(0x1000, 8), 0x1122_3344);
}
