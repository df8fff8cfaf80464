//! Interface hash computation.
//!
//! The RMI wire protocol has no way to ship interface class files, so a call
//! is admitted by a 64-bit fingerprint of the remote interface's method set.
//! The peer recomputes the same fingerprint from its own copy of the
//! interface; any deviation makes every call silently rejected, so the byte
//! stream fed to the digest must match the reference algorithm exactly. The
//! known-good check is the `java.rmi.registry.Registry` constant asserted in
//! the tests below.

use sha1::{Digest, Sha1};

/// One method of a simulated remote interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor<'a> {
    pub name: &'a str,
    /// JVM-style signature, e.g. `(Ljava/lang/String;)Ljava/rmi/Remote;`.
    pub descriptor: &'a str,
    /// Fully qualified names of the declared exception types.
    pub exceptions: &'a [&'a str],
}

/// The five methods of `java.rmi.registry.Registry`.
pub const REGISTRY_METHODS: [MethodDescriptor<'static>; 5] = [
    MethodDescriptor {
        name: "bind",
        descriptor: "(Ljava/lang/String;Ljava/rmi/Remote;)V",
        exceptions: &[
            "java.rmi.AccessException",
            "java.rmi.AlreadyBoundException",
            "java.rmi.RemoteException",
        ],
    },
    MethodDescriptor {
        name: "list",
        descriptor: "()[Ljava/lang/String;",
        exceptions: &["java.rmi.AccessException", "java.rmi.RemoteException"],
    },
    MethodDescriptor {
        name: "lookup",
        descriptor: "(Ljava/lang/String;)Ljava/rmi/Remote;",
        exceptions: &[
            "java.rmi.AccessException",
            "java.rmi.NotBoundException",
            "java.rmi.RemoteException",
        ],
    },
    MethodDescriptor {
        name: "rebind",
        descriptor: "(Ljava/lang/String;Ljava/rmi/Remote;)V",
        exceptions: &["java.rmi.AccessException", "java.rmi.RemoteException"],
    },
    MethodDescriptor {
        name: "unbind",
        descriptor: "(Ljava/lang/String;)V",
        exceptions: &[
            "java.rmi.AccessException",
            "java.rmi.NotBoundException",
            "java.rmi.RemoteException",
        ],
    },
];

const INTERFACE_HASH_STREAM_VERSION: i32 = 1;

/// Compute the interface hash for a remote interface's method set.
///
/// Methods and exception lists may be supplied in any order; both are sorted
/// internally (methods by `(name, descriptor)`, exceptions by name, ordinal
/// comparison) before hashing. Pure; identical input always yields the same
/// value.
pub fn interface_hash(methods: &[MethodDescriptor<'_>]) -> i64 {
    let mut sorted: Vec<&MethodDescriptor<'_>> = methods.iter().collect();
    sorted.sort_by(|a, b| (a.name, a.descriptor).cmp(&(b.name, b.descriptor)));

    let mut stream = Vec::new();
    stream.extend_from_slice(&INTERFACE_HASH_STREAM_VERSION.to_be_bytes());
    for method in sorted {
        write_utf(&mut stream, method.name);
        write_utf(&mut stream, method.descriptor);
        let mut exceptions: Vec<&str> = method.exceptions.to_vec();
        exceptions.sort_unstable();
        for exception in exceptions {
            write_utf(&mut stream, exception);
        }
    }

    let digest = Sha1::digest(&stream);
    // The first 8 digest bytes accumulated low-byte-first, the same order
    // serialVersionUID uses.
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_le_bytes(bytes)
}

/// The interface hash for `java.rmi.registry.Registry`.
pub fn registry_interface_hash() -> i64 {
    interface_hash(&REGISTRY_METHODS)
}

// Java `DataOutput::writeUTF`: u16 byte length then the bytes. Method and
// exception identifiers are ASCII, where modified UTF-8 and UTF-8 agree.
fn write_utf(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Published constant from `java.rmi.registry.RegistryImpl_Stub`.
    const REGISTRY_INTERFACE_HASH: i64 = 4905912898345647071;

    #[test]
    fn registry_hash_matches_reference_vector() {
        assert_eq!(registry_interface_hash(), REGISTRY_INTERFACE_HASH);
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(
            interface_hash(&REGISTRY_METHODS),
            interface_hash(&REGISTRY_METHODS)
        );
    }

    #[test]
    fn method_order_does_not_matter() {
        let mut reversed = REGISTRY_METHODS;
        reversed.reverse();
        assert_eq!(interface_hash(&reversed), REGISTRY_INTERFACE_HASH);
    }

    #[test]
    fn exception_order_does_not_matter() {
        let mut shuffled = REGISTRY_METHODS;
        shuffled[2].exceptions = &[
            "java.rmi.RemoteException",
            "java.rmi.AccessException",
            "java.rmi.NotBoundException",
        ];
        assert_eq!(interface_hash(&shuffled), REGISTRY_INTERFACE_HASH);
    }

    #[test]
    fn different_method_sets_produce_different_hashes() {
        let single = [REGISTRY_METHODS[2]];
        assert_ne!(interface_hash(&single), REGISTRY_INTERFACE_HASH);
    }
}
