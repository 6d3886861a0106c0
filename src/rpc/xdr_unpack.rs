
use std::io::{self, Error, ErrorKind};

use crate::xdr::Unpacker;
use crate::rpc::{REPLY, MSG_DENIED, RPC_MISMATCH, AUTH_ERROR, MSG_ACCEPTED, PROG_UNAVAIL, PROG_MISMATCH, PROC_UNAVAIL, GARBAGE_ARGS, SUCCESS};

pub fn unpack_auth(unpacker:&mut Unpacker) -> io::Result<(i32, Vec<u8>)> {
	let flavor:i32    = unpacker.unpack_enum()?;
	let stuff:Vec<u8> = unpacker.unpack_variable_len_opaque()?;
	Ok((flavor, stuff))
}

pub fn unpack_replyheader(unpacker:&mut Unpacker) -> io::Result<(u32, (i32, Vec<u8>))> {
	let xid:u32 = unpacker.unpack_u32()?;

	let mtype:i32 = unpacker.unpack_enum()?;
	if mtype != REPLY { return Err(Error::new(ErrorKind::Other, "Expected REPLY message type in unpack_replyheader")); }

	match unpacker.unpack_enum()? {
		MSG_DENIED => {
			match unpacker.unpack_enum()? {
				RPC_MISMATCH => {
					unpacker.unpack_u32()?;	// low supported version
					unpacker.unpack_u32()?;	// high supported version
					return Err(Error::new(ErrorKind::Other, "Message denied due to RPC_MISMATCH in unpack_replyheader"))
				},
				AUTH_ERROR => {
					unpacker.unpack_u32()?;	// detail status code
					return Err(Error::new(ErrorKind::Other, "Message denied due to AUTH_ERROR in unpack_replyheader"))
				},
				_ => return Err(Error::new(ErrorKind::Other, "Message denied for an unknown reason in unpack_replyheader")),
			}
		},
		MSG_ACCEPTED => { },
		_            => return Err(Error::new(ErrorKind::Other, "Neither MSG_DENIED nor MSG_ACCEPTED in unpack_replyheader")),
	}

	let verf = unpack_auth(unpacker)?;

	match unpacker.unpack_enum()? {
		PROG_UNAVAIL  => return Err(Error::new(ErrorKind::Other, "Program unavailable in unpack_replyheader")),
		PROG_MISMATCH => {
			unpacker.unpack_u32()?;	// low supported version
			unpacker.unpack_u32()?;	// high supported version
			return Err(Error::new(ErrorKind::Other, "Program mismatch in unpack_replyheader"))
		},
		PROC_UNAVAIL  => return Err(Error::new(ErrorKind::Other, "Procedure unavailable in unpack_replyheader")),
		GARBAGE_ARGS  => return Err(Error::new(ErrorKind::Other, "Garbage args in unpack_replyheader")),
		SUCCESS => { },
		_ => return Err(Error::new(ErrorKind::Other, "Call failed for unknown reason in unpack_replyheader")),
	}

	Ok((xid, verf))
}

#[cfg(test)]
mod tests {

	use crate::xdr::{Packer, Unpacker};
	use crate::rpc::{REPLY, MSG_ACCEPTED, SUCCESS};
	use super::unpack_replyheader;

	fn packed_accepted_reply(xid:u32) -> Vec<u8> {
		let mut packer = Packer::new();
		packer.pack_u32(xid).unwrap();
		packer.pack_enum(REPLY).unwrap();
		packer.pack_enum(MSG_ACCEPTED).unwrap();
		packer.pack_enum(0).unwrap();
		packer.pack_variable_len_opaque(&[]).unwrap();
		packer.pack_enum(SUCCESS).unwrap();
		packer.get_buf().to_vec()
	}

	#[test]
	fn accepted_success() {
		let mut unpacker = Unpacker::new();
		unpacker.reset(&packed_accepted_reply(42));
		let (xid, _verf) = unpack_replyheader(&mut unpacker).unwrap();
		assert_eq!(xid, 42);
		assert!(unpacker.all_data_consumed());
	}

	#[test]
	fn rejects_call_message_type() {
		let mut packer = Packer::new();
		packer.pack_u32(1).unwrap();
		packer.pack_enum(0).unwrap();	// CALL where REPLY is required

		let mut unpacker = Unpacker::new();
		unpacker.reset(packer.get_buf());
		assert!(unpack_replyheader(&mut unpacker).is_err());
	}

}
