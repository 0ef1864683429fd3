//! Micro-benchmarks for the k-bucket tree: add, closest, and remove
//! at varying table sizes. Reports nanoseconds-per-operation.
//!
//! Run: `cargo bench --bench routing_table`

use std::time::Instant;

use kad_dht_core::{Contact, Id, KBucketTree, PeerId};

fn main() {
    println!("routing_table\n");

    bench_add();
    bench_closest();
    bench_remove();
}

fn contacts(count: usize) -> Vec<Contact> {
    (0..count).map(|_| Contact::new(PeerId::random())).collect()
}

fn bench_add() {
    println!("add");

    // Pre-generate contacts outside the timed section
    let fresh = contacts(1000);

    for prefilled in [0, 100, 400] {
        let mut tree = KBucketTree::new(Id::random());
        for contact in contacts(prefilled) {
            tree.add(contact);
        }

        let start = Instant::now();
        for contact in fresh.iter().cloned() {
            tree.add(contact);
        }
        let per_op = start.elapsed().as_nanos() / fresh.len() as u128;
        println!(
            "{prefilled:>3} prefilled: {per_op}ns/op (final size: {})",
            tree.count()
        );
    }

    println!();
}

fn bench_closest() {
    println!("closest");

    let targets: Vec<_> = (0..1000).map(|_| Id::random()).collect();

    for size in [50, 100, 200, 400] {
        let mut tree = KBucketTree::new(Id::random());
        for contact in contacts(size) {
            tree.add(contact);
        }

        let start = Instant::now();
        for target in &targets {
            let _ = tree.closest(target, 20);
        }
        let per_op = start.elapsed().as_nanos() / targets.len() as u128;
        println!("{size:>3} nodes: {per_op}ns/op");
    }

    println!();
}

fn bench_remove() {
    println!("remove");

    let mut tree = KBucketTree::new(Id::random());

    let mut ids = Vec::new();
    for contact in contacts(200) {
        ids.push(*contact.id());
        tree.add(contact);
    }

    let n = ids.len();
    let start = Instant::now();
    for id in &ids {
        tree.remove(id);
    }
    let per_op = start.elapsed().as_nanos() / n as u128;
    println!("{per_op}ns/op ({n} removals)");
    println!();
}
