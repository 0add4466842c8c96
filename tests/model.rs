//! `EmbedVec` checked against `Vec` as a reference model.

use std::collections::VecDeque;

use embedvec::EmbedVec;
use embedvec::heap::{HeapStats, Tracked};
use proptest::prelude::*;

const EMBEDDED: usize = 8;

#[derive(Debug, Clone)]
enum Op {
    Push(i32),
    Pop,
    Insert(usize, i32),
    Remove(usize),
    SwapRemove(usize),
    Truncate(usize),
    Reserve(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<i32>().prop_map(Op::Push),
        1 => Just(Op::Pop),
        2 => (any::<usize>(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
        3 => any::<usize>().prop_map(Op::Remove),
        1 => any::<usize>().prop_map(Op::SwapRemove),
        1 => (0usize..24).prop_map(Op::Truncate),
        1 => (0usize..24).prop_map(Op::Reserve),
    ]
}

fn apply(vec: &mut EmbedVec<i32, EMBEDDED, Tracked<'_>>, model: &mut Vec<i32>, op: &Op) {
    match *op {
        Op::Push(v) => {
            vec.push(v);
            model.push(v);
        }
        Op::Pop => assert_eq!(vec.pop(), model.pop()),
        Op::Insert(i, v) => {
            let i = i % (model.len() + 1);
            vec.insert(i, v);
            model.insert(i, v);
        }
        Op::Remove(i) if !model.is_empty() => {
            let i = i % model.len();
            assert_eq!(vec.remove(i), model.remove(i));
        }
        Op::SwapRemove(i) if !model.is_empty() => {
            let i = i % model.len();
            assert_eq!(vec.swap_remove(i), model.swap_remove(i));
        }
        Op::Remove(_) | Op::SwapRemove(_) => {}
        Op::Truncate(n) => {
            vec.truncate(n);
            model.truncate(n);
        }
        Op::Reserve(n) => vec.reserve(n),
    }
}

proptest! {
    #[test]
    fn behaves_like_vec(ops in proptest::collection::vec(op(), 0..200)) {
        let stats = HeapStats::new();
        let mut vec: EmbedVec<i32, EMBEDDED, _> = EmbedVec::new_in(Tracked::new(&stats));
        let mut model = Vec::new();

        for op in &ops {
            let cap_before = vec.capacity();
            apply(&mut vec, &mut model, op);

            prop_assert_eq!(vec.as_slice(), model.as_slice());
            prop_assert!(vec.capacity() >= cap_before);
            prop_assert!(vec.len() <= vec.capacity());
            if vec.len() > EMBEDDED {
                prop_assert!(!vec.is_embedded());
            }
            if !vec.is_embedded() {
                prop_assert_eq!(vec.allocator().cursor(), Some(0));
            }
            // Only the live buffer may hold heap memory.
            prop_assert!(stats.live() <= 1);
        }

        drop(vec);
        prop_assert_eq!(stats.live(), 0);
    }

    #[test]
    fn oscillating_across_the_region_boundary(rounds in 1usize..64, width in 1usize..6) {
        let stats = HeapStats::new();
        let mut vec: EmbedVec<usize, EMBEDDED, _> = EmbedVec::new_in(Tracked::new(&stats));
        let mut model = VecDeque::new();

        for i in 0..EMBEDDED - 1 {
            vec.push(i);
            model.push_back(i);
        }
        for round in 0..rounds {
            for k in 0..width {
                let value = EMBEDDED + round * width + k;
                vec.push(value);
                model.push_back(value);
            }
            for _ in 0..width {
                prop_assert_eq!(Some(vec.remove(0)), model.pop_front());
            }
            prop_assert_eq!(vec.len(), EMBEDDED - 1);
            prop_assert!(vec.iter().eq(model.iter()));
        }

        // Capacity never shrinks, so crossing back and forth grows at most once.
        prop_assert!(stats.allocations() <= 1);
        prop_assert_eq!(stats.deallocations(), 0);
    }

    #[test]
    fn collect_matches_vec(items in proptest::collection::vec(any::<u8>(), 0..64)) {
        let vec: EmbedVec<u8, EMBEDDED> = items.iter().copied().collect();
        prop_assert_eq!(vec.is_embedded(), items.len() <= EMBEDDED);
        prop_assert_eq!(Vec::from(vec), items);
    }
}
