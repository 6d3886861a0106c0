
use std::io::{self, Write, Error, ErrorKind, Cursor};

use byteorder::{BigEndian, WriteBytesExt, ReadBytesExt};

// XDR keeps everything aligned to four bytes, so the packer only ever appends
// multiples of four and the unpacker only ever consumes multiples of four

pub struct Packer {
	buff: Vec<u8>,
}

pub struct Unpacker {
	buff: Vec<u8>,
	pos: usize,
}

impl Packer {

	pub fn new() -> Self { Packer{ buff: Vec::new() } }

	pub fn reset(&mut self) { self.buff.clear(); }

	pub fn get_buf(&self) -> &[u8] { &self.buff }

	pub fn pack_u32(&mut self, x:u32) -> io::Result<()> { self.buff.write_u32::<BigEndian>(x) }
	pub fn pack_i32(&mut self, x:i32) -> io::Result<()> { self.buff.write_i32::<BigEndian>(x) }

	// An enum is just an i32 with a restricted set of values; the restriction
	// depends on the application, so no check is possible at this level
	pub fn pack_enum(&mut self, x:i32) -> io::Result<()> { self.pack_i32(x) }

	pub fn pack_bool(&mut self, b:bool) -> io::Result<()> {
		if b { self.pack_i32(1) }
		else { self.pack_i32(0) }
	}

	pub fn pack_variable_len_opaque(&mut self, data:&[u8]) -> io::Result<()> {
		self.pack_u32(data.len() as u32)?;
		self.buff.write_all(data)?;

		// Pad back up to four-byte alignment
		while self.buff.len() % 4 != 0 { self.buff.push(0); }
		Ok(())
	}

}

impl Unpacker {

	pub fn new() -> Self { Unpacker{ buff: Vec::new(), pos: 0 } }

	pub fn reset(&mut self, data:&[u8]) {
		self.buff.clear();
		self.buff.extend_from_slice(data);
		self.pos = 0;
	}

	pub fn all_data_consumed(&self) -> bool { self.pos == self.buff.len() }

	fn take(&mut self, n:usize) -> io::Result<&[u8]> {
		if self.pos + n > self.buff.len() {
			return Err(Error::new(ErrorKind::UnexpectedEof, "Tried to read past the end of the buffer"));
		}
		let ans:&[u8] = &self.buff[self.pos..self.pos+n];
		self.pos += n;
		Ok(ans)
	}

	pub fn unpack_u32(&mut self) -> io::Result<u32> {
		let mut rdr = Cursor::new(self.take(4)?);
		rdr.read_u32::<BigEndian>()
	}

	pub fn unpack_i32(&mut self) -> io::Result<i32> {
		let mut rdr = Cursor::new(self.take(4)?);
		rdr.read_i32::<BigEndian>()
	}

	pub fn unpack_enum(&mut self) -> io::Result<i32> { self.unpack_i32() }

	pub fn unpack_bool(&mut self) -> io::Result<bool> {
		match self.unpack_i32()? {
			0 => Ok(false),
			1 => Ok(true),
			x => Err(Error::new(ErrorKind::InvalidData, format!("Expected 0 or 1 in unpack_bool but got {}", x))),
		}
	}

	pub fn unpack_variable_len_opaque(&mut self) -> io::Result<Vec<u8>> {
		let n:u32 = self.unpack_u32()?;
		let ans:Vec<u8> = self.take(n as usize)?.to_vec();

		// Consume the padding that restores four-byte alignment
		let pad:usize = (4 - (n as usize % 4)) % 4;
		self.take(pad)?;
		Ok(ans)
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn pack_unpack_scalars() {
		let mut packer = Packer::new();
		packer.pack_u32(0x0607af).unwrap();
		packer.pack_i32(-3).unwrap();
		packer.pack_bool(true).unwrap();

		let mut unpacker = Unpacker::new();
		unpacker.reset(packer.get_buf());
		assert_eq!(unpacker.unpack_u32().unwrap(), 0x0607af);
		assert_eq!(unpacker.unpack_i32().unwrap(), -3);
		assert_eq!(unpacker.unpack_bool().unwrap(), true);
		assert!(unpacker.all_data_consumed());
	}

	#[test]
	fn opaque_padding() {
		// 6 bytes of payload means 2 bytes of padding to stay aligned
		let mut packer = Packer::new();
		packer.pack_variable_len_opaque(b"*IDN?\n").unwrap();
		assert_eq!(packer.get_buf().len(), 4 + 6 + 2);

		let mut unpacker = Unpacker::new();
		unpacker.reset(packer.get_buf());
		assert_eq!(unpacker.unpack_variable_len_opaque().unwrap(), b"*IDN?\n");
		assert!(unpacker.all_data_consumed());
	}

	#[test]
	fn read_past_end() {
		let mut unpacker = Unpacker::new();
		unpacker.reset(&[0, 0]);
		assert!(unpacker.unpack_u32().is_err());
	}

}
