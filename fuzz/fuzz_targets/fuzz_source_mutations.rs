#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sectioned_core::{ArraySection, DataSource, Event, IndexPath};
use sectioned_store::{ArrayDataSource, MappingDataSource, SectionCounts, UpdateBuffer};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Append(u8),
    Insert { section: u8, item: u8, value: u8 },
    Remove { section: u8, item: u8 },
    Replace { section: u8, item: u8, value: u8 },
    Move { from: (u8, u8), to: (u8, u8) },
    InsertSection { index: u8, values: Vec<u8> },
    RemoveSection(u8),
    ReplaceSection { index: u8, values: Vec<u8> },
    Batch(Vec<FuzzOp>),
}

/// Resolve selectors against the current shape and run `op` if it is valid.
fn run(op: &FuzzOp, source: &ArrayDataSource<u8>, depth: usize) {
    let sections = source.sections_count();
    let len = |section: usize| source.number_of_objects(section);
    match op {
        FuzzOp::Append(value) => source.append(*value),
        FuzzOp::Insert { section, item, value } if sections > 0 => {
            let section = usize::from(*section) % sections;
            let item = usize::from(*item) % (len(section) + 1);
            source.insert(*value, IndexPath::new(section, item));
        }
        FuzzOp::Remove { section, item } if sections > 0 => {
            let section = usize::from(*section) % sections;
            if len(section) > 0 {
                source.remove(IndexPath::new(section, usize::from(*item) % len(section)));
            }
        }
        FuzzOp::Replace { section, item, value } if sections > 0 => {
            let section = usize::from(*section) % sections;
            if len(section) > 0 {
                let item = usize::from(*item) % len(section);
                source.replace(IndexPath::new(section, item), *value);
            }
        }
        FuzzOp::Move { from, to } if sections > 0 => {
            let from_section = usize::from(from.0) % sections;
            if len(from_section) == 0 {
                return;
            }
            let from = IndexPath::new(from_section, usize::from(from.1) % len(from_section));
            let to_section = usize::from(to.0) % sections;
            let room = len(to_section) + usize::from(to_section != from_section);
            source.move_object(from, IndexPath::new(to_section, usize::from(to.1) % room));
        }
        FuzzOp::InsertSection { index, values } => {
            let index = usize::from(*index) % (sections + 1);
            source.insert_section(ArraySection::new(values.clone()), index);
        }
        FuzzOp::RemoveSection(index) if sections > 0 => {
            source.remove_section(usize::from(*index) % sections);
        }
        FuzzOp::ReplaceSection { index, values } if sections > 0 => {
            let index = usize::from(*index) % sections;
            source.replace_section(index, ArraySection::new(values.clone()));
        }
        FuzzOp::Batch(ops) if depth < 4 => source.apply(false, |source| {
            for op in ops {
                run(op, source, depth + 1);
            }
        }),
        _ => {}
    }
}

fuzz_target!(|input: Vec<FuzzOp>| {
    let source = ArrayDataSource::<u8>::new();
    let mapping = MappingDataSource::new(&source, |value: u8| u16::from(value));
    let counts = Rc::new(RefCell::new(SectionCounts::of(&mapping)));
    let buffer = RefCell::new(UpdateBuffer::new());
    let (reader, sink) = (mapping.clone(), Rc::clone(&counts));
    let _subscription = mapping.observe(Box::new(move |event: &Event| {
        let released = buffer.borrow_mut().push(event);
        if let Some(reconcile) = released {
            sink.borrow_mut().reconcile(&reader, &reconcile);
        }
    }));

    for op in input.iter().take(256) {
        run(op, &source, 0);
    }

    assert_eq!(*counts.borrow(), SectionCounts::of(&source));
    for section in 0..source.sections_count() {
        let mapped: Vec<u16> = source
            .objects_in_section(section)
            .into_iter()
            .map(u16::from)
            .collect();
        assert_eq!(mapping.objects_in_section(section), mapped);
    }
});
