use crate::error::Error;
use crate::io::{BufMutExt, ProtocolEncode};
use crate::protocol::auth::AuthPlugin;
use crate::protocol::connect::SslRequest;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/connection-phase-packets.html#packet-Protocol::HandshakeResponse
// https://mariadb.com/kb/en/connection/#client-handshake-response

#[derive(Debug)]
pub(crate) struct HandshakeResponse<'a> {
    pub(crate) database: Option<&'a str>,

    /// Max size of a command packet that the client wants to send to the server.
    pub(crate) max_packet_size: u32,

    /// Default collation for the connection.
    pub(crate) collation: u8,

    /// Name of the SQL account which the client wants to log in as.
    pub(crate) username: &'a str,

    /// Authentication method used by the client.
    pub(crate) auth_plugin: Option<AuthPlugin>,

    /// Opaque authentication response.
    pub(crate) auth_response: Option<&'a [u8]>,
}

impl ProtocolEncode<'_, Capabilities> for HandshakeResponse<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, mut context: Capabilities) -> Result<(), Error> {
        if self.auth_plugin.is_none() {
            // ensure PLUGIN_AUTH is set *only* if we have a defined plugin
            context.remove(Capabilities::PLUGIN_AUTH);
        }

        // NOTE: the first half of this packet is identical to the SSL request
        SslRequest {
            max_packet_size: self.max_packet_size,
            collation: self.collation,
        }
        .encode_with(buf, context)?;

        buf.put_str_nul(self.username);

        if context.contains(Capabilities::PLUGIN_AUTH_LENENC_DATA) {
            buf.put_bytes_lenenc(self.auth_response.unwrap_or_default());
        } else if context.contains(Capabilities::SECURE_CONNECTION) {
            let response = self.auth_response.unwrap_or_default();

            let len = u8::try_from(response.len())
                .map_err(|_| err_protocol!("auth response too long: {} bytes", response.len()))?;

            buf.push(len);
            buf.extend_from_slice(response);
        } else {
            buf.push(0);
        }

        if context.contains(Capabilities::CONNECT_WITH_DB) {
            if let Some(database) = self.database {
                buf.put_str_nul(database);
            } else {
                buf.push(0);
            }
        }

        if context.contains(Capabilities::PLUGIN_AUTH) {
            if let Some(plugin) = self.auth_plugin {
                buf.put_str_nul(plugin.name());
            } else {
                buf.push(0);
            }
        }

        Ok(())
    }
}
