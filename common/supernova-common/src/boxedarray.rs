//! Heap-allocated fixed-size arrays for emulated memories, serialized as one
//! raw byte run.
//!
//! Two problems with using `Box<[u8; LEN]>` directly in bincode-encoded
//! state: the generated `Decode` materializes the array on the stack before
//! boxing it, which overflows the stack for memory-sized arrays, and the
//! generated word-array codec round-trips every element through the integer
//! encoder. Both wrappers here encode and decode the whole array as a single
//! `bytemuck` byte view straight into heap storage.

use bincode::de::read::Reader;
use bincode::de::{BorrowDecoder, Decoder};
use bincode::enc::write::Writer;
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{BorrowDecode, Decode, Encode};
use std::ops::{Deref, DerefMut};

macro_rules! impl_boxed_array {
    ($name:ident, $elem:ty) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name<const LEN: usize>(Box<[$elem; LEN]>);

        impl<const LEN: usize> $name<LEN> {
            #[must_use]
            #[allow(clippy::missing_panics_doc)]
            pub fn new() -> Self {
                Self(vec![0; LEN].into_boxed_slice().try_into().unwrap())
            }
        }

        impl<const LEN: usize> Default for $name<LEN> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<const LEN: usize> From<Box<[$elem; LEN]>> for $name<LEN> {
            fn from(value: Box<[$elem; LEN]>) -> Self {
                Self(value)
            }
        }

        impl<const LEN: usize> Deref for $name<LEN> {
            type Target = Box<[$elem; LEN]>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl<const LEN: usize> DerefMut for $name<LEN> {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl<const LEN: usize> Encode for $name<LEN> {
            fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
                encoder.writer().write(bytemuck::cast_slice(self.0.as_slice()))
            }
        }

        impl<const LEN: usize, Context> Decode<Context> for $name<LEN> {
            fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
                let mut array = Self::new();
                decoder.reader().read(bytemuck::cast_slice_mut(array.0.as_mut_slice()))?;
                Ok(array)
            }
        }

        impl<'de, const LEN: usize, Context> BorrowDecode<'de, Context> for $name<LEN> {
            fn borrow_decode<D: BorrowDecoder<'de, Context = Context>>(
                decoder: &mut D,
            ) -> Result<Self, DecodeError> {
                let mut array = Self::new();
                decoder.reader().read(bytemuck::cast_slice_mut(array.0.as_mut_slice()))?;
                Ok(array)
            }
        }
    };
}

impl_boxed_array!(BoxedByteArray, u8);
impl_boxed_array!(BoxedWordArray, u16);
