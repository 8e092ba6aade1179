//! 256-bit machine word.
//!
//! Values on the operand stack, pooled push constants and jump targets are
//! all `Word`s. Arithmetic wraps modulo 2^256; signed operations interpret
//! the word as two's complement.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

use serde::{Serialize, Serializer};

/// Unsigned 256-bit integer, four little-endian `u64` limbs.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Word([u64; 4]);

impl Word {
    pub const ZERO: Word = Word([0; 4]);
    pub const ONE: Word = Word([1, 0, 0, 0]);
    pub const MAX: Word = Word([u64::MAX; 4]);

    pub const fn from_u64(value: u64) -> Self {
        Word([value, 0, 0, 0])
    }

    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Word(limbs)
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let start = 32 - (i + 1) * 8;
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[start..start + 8]);
            *limb = u64::from_be_bytes(chunk);
        }
        Word(limbs)
    }

    /// Decode a big-endian slice. Short slices are left-padded with zeros;
    /// for slices longer than 32 bytes only the trailing 32 are kept.
    pub fn from_be_slice(bytes: &[u8]) -> Self {
        let bytes = if bytes.len() > 32 {
            &bytes[bytes.len() - 32..]
        } else {
            bytes
        };
        let mut buf = [0u8; 32];
        buf[32 - bytes.len()..].copy_from_slice(bytes);
        Self::from_be_bytes(buf)
    }

    pub fn to_be_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().enumerate() {
            let start = 32 - (i + 1) * 8;
            out[start..start + 8].copy_from_slice(&limb.to_be_bytes());
        }
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }

    pub fn low_u64(&self) -> u64 {
        self.0[0]
    }

    /// Returns the value as `usize` if it fits.
    pub fn to_usize(&self) -> Option<usize> {
        if self.0[1] != 0 || self.0[2] != 0 || self.0[3] != 0 {
            return None;
        }
        usize::try_from(self.0[0]).ok()
    }

    pub fn bit(&self, index: usize) -> bool {
        index < 256 && (self.0[index / 64] >> (index % 64)) & 1 == 1
    }

    fn set_bit(&mut self, index: usize) {
        self.0[index / 64] |= 1 << (index % 64);
    }

    /// Number of significant bits.
    pub fn bits(&self) -> usize {
        for i in (0..4).rev() {
            if self.0[i] != 0 {
                return i * 64 + (64 - self.0[i].leading_zeros() as usize);
            }
        }
        0
    }

    /// Number of significant bytes.
    pub fn byte_len(&self) -> usize {
        self.bits().div_ceil(8)
    }

    /// Big-endian byte `index` (0 is the most significant); zero past 31.
    pub fn byte(&self, index: usize) -> u8 {
        if index >= 32 {
            return 0;
        }
        self.to_be_bytes()[index]
    }

    pub fn overflowing_add(self, rhs: Word) -> (Word, bool) {
        let mut out = [0u64; 4];
        let mut carry = false;
        for (i, limb) in out.iter_mut().enumerate() {
            let (sum, c1) = self.0[i].overflowing_add(rhs.0[i]);
            let (sum, c2) = sum.overflowing_add(carry as u64);
            *limb = sum;
            carry = c1 || c2;
        }
        (Word(out), carry)
    }

    pub fn wrapping_add(self, rhs: Word) -> Word {
        self.overflowing_add(rhs).0
    }

    pub fn overflowing_sub(self, rhs: Word) -> (Word, bool) {
        let mut out = [0u64; 4];
        let mut borrow = false;
        for (i, limb) in out.iter_mut().enumerate() {
            let (diff, b1) = self.0[i].overflowing_sub(rhs.0[i]);
            let (diff, b2) = diff.overflowing_sub(borrow as u64);
            *limb = diff;
            borrow = b1 || b2;
        }
        (Word(out), borrow)
    }

    pub fn wrapping_sub(self, rhs: Word) -> Word {
        self.overflowing_sub(rhs).0
    }

    pub fn wrapping_mul(self, rhs: Word) -> Word {
        let mut out = [0u64; 4];
        for i in 0..4 {
            let mut carry: u128 = 0;
            for j in 0..4 - i {
                let cur = out[i + j] as u128 + (self.0[i] as u128) * (rhs.0[j] as u128) + carry;
                out[i + j] = cur as u64;
                carry = cur >> 64;
            }
        }
        Word(out)
    }

    pub fn wrapping_neg(self) -> Word {
        (!self).wrapping_add(Word::ONE)
    }

    /// Quotient and remainder; both are zero when `divisor` is zero.
    pub fn div_rem(self, divisor: Word) -> (Word, Word) {
        if divisor.is_zero() {
            return (Word::ZERO, Word::ZERO);
        }
        if self < divisor {
            return (Word::ZERO, self);
        }
        if let (Some(a), Some(b)) = (self.to_u128(), divisor.to_u128()) {
            return (Word::from_u128(a / b), Word::from_u128(a % b));
        }
        let mut quotient = Word::ZERO;
        let mut rem = Word::ZERO;
        for i in (0..self.bits()).rev() {
            let carry = rem.bit(255);
            rem = rem.shl(1);
            if self.bit(i) {
                rem.0[0] |= 1;
            }
            if carry || rem >= divisor {
                rem = rem.wrapping_sub(divisor);
                quotient.set_bit(i);
            }
        }
        (quotient, rem)
    }

    fn to_u128(self) -> Option<u128> {
        if self.0[2] != 0 || self.0[3] != 0 {
            return None;
        }
        Some((self.0[1] as u128) << 64 | self.0[0] as u128)
    }

    fn from_u128(value: u128) -> Word {
        Word([value as u64, (value >> 64) as u64, 0, 0])
    }

    pub fn shl(self, shift: usize) -> Word {
        if shift >= 256 {
            return Word::ZERO;
        }
        let limbs = shift / 64;
        let bits = shift % 64;
        let mut out = [0u64; 4];
        for i in (limbs..4).rev() {
            let src = i - limbs;
            out[i] = self.0[src] << bits;
            if bits > 0 && src > 0 {
                out[i] |= self.0[src - 1] >> (64 - bits);
            }
        }
        Word(out)
    }

    pub fn shr(self, shift: usize) -> Word {
        if shift >= 256 {
            return Word::ZERO;
        }
        let limbs = shift / 64;
        let bits = shift % 64;
        let mut out = [0u64; 4];
        for (i, limb) in out.iter_mut().enumerate().take(4 - limbs) {
            let src = i + limbs;
            *limb = self.0[src] >> bits;
            if bits > 0 && src + 1 < 4 {
                *limb |= self.0[src + 1] << (64 - bits);
            }
        }
        Word(out)
    }

    pub fn is_negative(&self) -> bool {
        self.bit(255)
    }

    fn abs(self) -> Word {
        if self.is_negative() {
            self.wrapping_neg()
        } else {
            self
        }
    }

    pub fn signed_cmp(&self, other: &Word) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.cmp(other),
        }
    }

    /// Signed division; `MIN / -1` wraps to `MIN`.
    pub fn signed_div(self, divisor: Word) -> Word {
        if divisor.is_zero() {
            return Word::ZERO;
        }
        let (quotient, _) = self.abs().div_rem(divisor.abs());
        if self.is_negative() != divisor.is_negative() {
            quotient.wrapping_neg()
        } else {
            quotient
        }
    }

    /// Signed remainder, taking the sign of the dividend.
    pub fn signed_rem(self, divisor: Word) -> Word {
        if divisor.is_zero() {
            return Word::ZERO;
        }
        let (_, rem) = self.abs().div_rem(divisor.abs());
        if self.is_negative() {
            rem.wrapping_neg()
        } else {
            rem
        }
    }

    pub fn add_mod(self, rhs: Word, modulus: Word) -> Word {
        if modulus.is_zero() {
            return Word::ZERO;
        }
        let a = self.div_rem(modulus).1;
        let b = rhs.div_rem(modulus).1;
        let (sum, overflow) = a.overflowing_add(b);
        if overflow || sum >= modulus {
            sum.wrapping_sub(modulus)
        } else {
            sum
        }
    }

    pub fn mul_mod(self, rhs: Word, modulus: Word) -> Word {
        if modulus.is_zero() {
            return Word::ZERO;
        }
        let a = self.div_rem(modulus).1;
        let mut acc = Word::ZERO;
        for i in (0..rhs.bits()).rev() {
            acc = acc.add_mod(acc, modulus);
            if rhs.bit(i) {
                acc = acc.add_mod(a, modulus);
            }
        }
        acc
    }

    pub fn wrapping_pow(self, exponent: Word) -> Word {
        let mut acc = Word::ONE;
        for i in (0..exponent.bits()).rev() {
            acc = acc.wrapping_mul(acc);
            if exponent.bit(i) {
                acc = acc.wrapping_mul(self);
            }
        }
        acc
    }

    /// Sign-extend from byte `index` (counted from the least significant end).
    pub fn sign_extend(self, index: Word) -> Word {
        let Some(index) = index.to_usize().filter(|i| *i < 31) else {
            return self;
        };
        let bit = index * 8 + 7;
        let mask = Word::ONE.shl(bit + 1).wrapping_sub(Word::ONE);
        if self.bit(bit) { self | !mask } else { self & mask }
    }
}

impl Ord for Word {
    fn cmp(&self, other: &Self) -> Ordering {
        for i in (0..4).rev() {
            match self.0[i].cmp(&other.0[i]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Word {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        Word::from_u64(value)
    }
}

impl From<usize> for Word {
    fn from(value: usize) -> Self {
        Word::from_u64(value as u64)
    }
}

impl From<bool> for Word {
    fn from(value: bool) -> Self {
        Word::from_u64(value as u64)
    }
}

impl BitAnd for Word {
    type Output = Word;
    fn bitand(self, rhs: Word) -> Word {
        Word(std::array::from_fn(|i| self.0[i] & rhs.0[i]))
    }
}

impl BitOr for Word {
    type Output = Word;
    fn bitor(self, rhs: Word) -> Word {
        Word(std::array::from_fn(|i| self.0[i] | rhs.0[i]))
    }
}

impl BitXor for Word {
    type Output = Word;
    fn bitxor(self, rhs: Word) -> Word {
        Word(std::array::from_fn(|i| self.0[i] ^ rhs.0[i]))
    }
}

impl Not for Word {
    type Output = Word;
    fn not(self) -> Word {
        Word(std::array::from_fn(|i| !self.0[i]))
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(small) = self.to_u128() {
            return write!(f, "{}", small);
        }
        // Peel off 19 decimal digits at a time.
        const CHUNK: u64 = 10_000_000_000_000_000_000;
        let mut parts = Vec::new();
        let mut rest = *self;
        while !rest.is_zero() {
            let (q, r) = rest.div_rem(Word::from_u64(CHUNK));
            parts.push(r.low_u64());
            rest = q;
        }
        let mut iter = parts.iter().rev();
        if let Some(first) = iter.next() {
            write!(f, "{}", first)?;
        }
        for part in iter {
            write!(f, "{:019}", part)?;
        }
        Ok(())
    }
}

impl fmt::LowerHex for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }
        let mut started = false;
        for limb in self.0.iter().rev() {
            if started {
                write!(f, "{:016x}", limb)?;
            } else if *limb != 0 {
                write!(f, "{:x}", limb)?;
                started = true;
            }
        }
        if !started {
            f.write_str("0")?;
        }
        Ok(())
    }
}

impl Serialize for Word {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{:#x}", self))
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({:#x})", self)
    }
}
