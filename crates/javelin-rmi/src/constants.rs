//! Wire constants shared across the engine.

/// JRMP message type for an outbound call.
pub const CALL_MESSAGE: u8 = 0x50;
/// JRMP message type for return data.
pub const RETURN_DATA: u8 = 0x51;

/// Return discrimination codes inside the reply stream.
pub const RETURN_NORMAL: u8 = 0x01;
pub const RETURN_EXCEPTION: u8 = 0x02;

/// Operation selector meaning "dispatch by method hash". A non-negative
/// value would select a method by index instead; Javelin never sends one.
pub const OPERATION_DISPATCH_BY_HASH: i32 = -1;

/// Method hash of `javax.management.remote.rmi.RMIServer.newClient`. This is
/// a fixed property of the standard JMX remote interface and is carried as a
/// constant rather than recomputed.
pub const JMX_NEWCLIENT_METHOD_HASH: i64 = -1089742558549201240;

/// serialVersionUID of `java.lang.String[]`, used when building credential
/// arrays for `newClient`.
pub const STRING_ARRAY_SERIAL_VERSION_UID: i64 = -5921575005990323385;

/// Wire class name of `String[]`.
pub const STRING_ARRAY_CLASS: &str = "[Ljava.lang.String;";
pub const STRING_ELEMENT_TYPE: &str = "java.lang.String";
