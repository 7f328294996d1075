use bytes::Bytes;

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::auth::AuthPlugin;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_auth_switch_request.html

/// The server's demand to redo authentication with a different plugin and a
/// fresh challenge.
#[derive(Debug)]
pub(crate) struct AuthSwitchRequest {
    pub(crate) plugin: AuthPlugin,
    pub(crate) data: Bytes,
}

impl ProtocolDecode<'_, Capabilities> for AuthSwitchRequest {
    fn decode_with(mut buf: Bytes, _: Capabilities) -> Result<Self, Error> {
        let header = buf.read_u8()?;
        if header != 0xfe {
            return Err(err_protocol!("expected 0xfe (AUTH_SWITCH) but found 0x{header:02x}"));
        }

        let plugin = buf.get_str_nul()?.parse()?;

        // the challenge is an EOF string with a trailing NUL pad
        let mut data = buf.get_bytes_eof();
        if data.last() == Some(&0) {
            data.truncate(data.len() - 1);
        }

        Ok(Self { plugin, data })
    }
}

#[derive(Debug)]
pub(crate) struct AuthSwitchResponse(pub(crate) Vec<u8>);

impl ProtocolEncode<'_, Capabilities> for AuthSwitchResponse {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.extend_from_slice(&self.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_switch_request() {
        const DATA: &[u8] = b"\xfecaching_sha2_password\0abcdefghijabcdefghij\0";

        let switch =
            AuthSwitchRequest::decode_with(DATA.into(), Capabilities::empty()).unwrap();

        assert_eq!(switch.plugin, AuthPlugin::CachingSha2Password);
        assert_eq!(&switch.data[..], b"abcdefghijabcdefghij");
    }

    #[test]
    fn rejects_unknown_plugin() {
        const DATA: &[u8] = b"\xfedialog\0";

        let err =
            AuthSwitchRequest::decode_with(DATA.into(), Capabilities::empty()).unwrap_err();

        assert!(matches!(err, Error::UnknownAuthPlugin(name) if name == "dialog"));
    }
}
