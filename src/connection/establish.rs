use bytes::{Buf, Bytes};

use crate::connection::stream::{MySqlStream, MAX_PACKET_SIZE};
use crate::connection::MySqlConnection;
use crate::error::Error;
use crate::net::{self, Socket};
use crate::options::{MySqlConnectOptions, MySqlSslMode};
use crate::protocol::auth::AuthPlugin;
use crate::protocol::connect::{AuthSwitchRequest, AuthSwitchResponse, Handshake, HandshakeResponse};
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/connection-phase.html

// the connection phase performs these tasks:
//  - exchange the capabilities of client and server
//  - set up the TLS channel if requested
//  - authenticate the client against the server

impl MySqlConnection {
    /// Open a connection, perform the handshake, and authenticate.
    pub async fn connect(options: &MySqlConnectOptions) -> Result<Self, Error> {
        let (socket, is_unix_socket): (Box<dyn Socket>, bool) = match &options.socket {
            Some(path) => (Box::new(net::connect_uds(path).await?), true),
            None => (
                Box::new(
                    net::connect_tcp(options.resolver.as_ref(), &options.host, options.port)
                        .await?,
                ),
                false,
            ),
        };

        let mut stream = MySqlStream::new(options, socket, is_unix_socket);

        // the server opens with its greeting
        let handshake: Handshake = stream.recv_packet().await?.decode()?;

        stream.server_version = parse_server_version(&handshake.server_version);
        stream.status = handshake.status;

        if !handshake.server_capabilities.contains(Capabilities::PROTOCOL_41) {
            return Err(err_protocol!(
                "server {} does not support the 4.1 protocol",
                handshake.server_version
            ));
        }

        log::debug!(
            "connected to server {} (connection id {})",
            handshake.server_version,
            handshake.connection_id
        );

        // keep only the capabilities both sides understand
        stream.capabilities &= handshake.server_capabilities;

        maybe_upgrade_tls(&mut stream, options, &handshake).await?;

        let password = options.password.as_deref().unwrap_or_default();
        let mut plugin = handshake.auth_plugin.unwrap_or(AuthPlugin::MySqlNativePassword);
        let mut nonce = handshake.auth_plugin_data;

        let auth_response = plugin.scramble(password, &nonce);

        stream.write_packet(HandshakeResponse {
            database: options.database.as_deref(),
            max_packet_size: MAX_PACKET_SIZE,
            collation: options.collation,
            username: &options.username,
            auth_plugin: Some(plugin),
            auth_response: Some(&auth_response),
        })?;
        stream.flush().await?;

        // zero or more authentication exchanges end in the final OK
        loop {
            let packet = stream.recv_packet().await?;

            match packet.first().copied() {
                Some(0x00) => {
                    let ok = packet.ok(stream.capabilities)?;
                    stream.status = ok.status;
                    break;
                }

                // in the connection phase an 0xfe packet is an auth switch
                Some(0xfe) => {
                    let switch: AuthSwitchRequest = packet.decode_with(stream.capabilities)?;

                    plugin = switch.plugin;
                    nonce = Bytes::new().chain(switch.data);

                    let response = plugin.scramble(password, &nonce);
                    stream.write_packet(AuthSwitchResponse(response))?;
                    stream.flush().await?;
                }

                // "more data" from caching_sha2_password fast authentication
                Some(0x01) => match packet.get(1).copied() {
                    // fast path accepted; the OK packet follows
                    Some(0x03) => continue,

                    // full authentication: the server wants the cleartext
                    // password, which may only travel over a secure channel
                    Some(0x04) => {
                        if !stream.is_secure() {
                            return Err(Error::AuthPluginRequiresSecureConnection);
                        }

                        let mut cleartext = password.as_bytes().to_vec();
                        cleartext.push(0);

                        stream.write_packet(&cleartext[..])?;
                        stream.flush().await?;
                    }

                    other => {
                        return Err(err_protocol!(
                            "unexpected auth continuation {other:?}; expected 0x03 or 0x04"
                        ));
                    }
                },

                tag => {
                    return Err(err_protocol!(
                        "unexpected packet {tag:?} during authentication"
                    ));
                }
            }
        }

        Ok(MySqlConnection { stream })
    }
}

async fn maybe_upgrade_tls(
    stream: &mut MySqlStream,
    options: &MySqlConnectOptions,
    handshake: &Handshake,
) -> Result<(), Error> {
    if options.ssl_mode == MySqlSslMode::Disabled {
        return Ok(());
    }

    let server_offers_tls = handshake.server_capabilities.contains(Capabilities::SSL);

    match (&options.tls, server_offers_tls) {
        (Some(tls), true) => {
            stream.capabilities.insert(Capabilities::SSL);
            stream.upgrade_tls(tls.as_ref(), &options.host, options.collation).await
        }

        _ if options.ssl_mode == MySqlSslMode::Required => Err(Error::TlsUnsupported),

        // `Enabled` continues in cleartext when TLS cannot be negotiated
        _ => Ok(()),
    }
}

// versions look like "8.0.36", "8.0.36-debug", or "5.5.5-10.6.16-MariaDB"
fn parse_server_version(version: &str) -> (u16, u16, u16) {
    let mut parts = version
        .split('-')
        .next()
        .unwrap_or_default()
        .splitn(3, '.')
        .map(|part| part.parse::<u16>().unwrap_or(0));

    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}
