use core::{cmp, marker::PhantomData};
use serde_core::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{SeqAccess, Visitor},
    ser::SerializeSeq,
};

use crate::{EmbedVec, HeapAlloc};

/// Upper bound on the capacity pre-reserved from an untrusted length hint.
const MAX_PREALLOC: usize = 4096;

impl<T: Serialize, const N: usize, H: HeapAlloc> Serialize for EmbedVec<T, N, H> {
    /// Serialize an `EmbedVec` as a sequence.
    ///
    /// The format is identical whether the data is embedded or on the heap.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for element in self {
            seq.serialize_element(element)?;
        }
        seq.end()
    }
}

impl<'de, T: Deserialize<'de>, const N: usize, H: HeapAlloc + Default> Deserialize<'de>
    for EmbedVec<T, N, H>
{
    /// Deserialize an `EmbedVec` from a sequence.
    ///
    /// Sequences longer than `N` end up on the heap.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EmbedVecVisitor<T, const N: usize, H> {
            _marker: PhantomData<(T, H)>,
        }

        impl<'de, T: Deserialize<'de>, const N: usize, H: HeapAlloc + Default> Visitor<'de>
            for EmbedVecVisitor<T, N, H>
        {
            type Value = EmbedVec<T, N, H>;

            fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                formatter.write_str("a sequence")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut vec = match seq.size_hint() {
                    Some(hint) => {
                        EmbedVec::with_capacity_in(cmp::min(hint, MAX_PREALLOC), H::default())
                    }
                    None => EmbedVec::new_in(H::default()),
                };

                while let Some(element) = seq.next_element()? {
                    vec.push(element);
                }

                Ok(vec)
            }
        }

        deserializer.deserialize_seq(EmbedVecVisitor {
            _marker: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{EmbedVec, embedvec};

    #[test]
    fn embedvec_json() {
        let v: EmbedVec<_, 5> = embedvec![1, 2, 3];
        let s = serde_json::to_string(&v).unwrap();
        assert_eq!(s, "[1,2,3]");

        let r: EmbedVec<i32, 5> = serde_json::from_str(&s).unwrap();
        assert_eq!(r, [1, 2, 3]);
        assert!(r.is_embedded());
    }

    #[test]
    fn embedvec_json_spills() {
        let r: EmbedVec<i32, 2> = serde_json::from_str("[1,2,3,4]").unwrap();
        assert_eq!(r, [1, 2, 3, 4]);
        assert!(!r.is_embedded());
    }
}
