//! Registration driven through the engine: capability negotiation, SASL,
//! the welcome gate and capability changes after registration.

mod common;

use common::{feed, make_client, make_config, registered_client};
use slirc_client::{Capability, ClientError, DestinationFlag, HostMask};

#[test]
fn test_golden_registration() {
    let (client, transport) = make_client(make_config());
    client.start();
    assert_eq!(transport.take(), vec!["CAP LS 302"]);

    feed(&client, &[":irc.example.net CAP * LS :account-notify extended-join multi-prefix"]);
    assert_eq!(transport.take(), vec!["CAP REQ :account-notify extended-join multi-prefix"]);

    feed(&client, &[":irc.example.net CAP * ACK :account-notify extended-join multi-prefix"]);
    assert_eq!(
        transport.take(),
        vec!["CAP END", "USER username * * :real name", "NICK stwtestbot"]
    );
    assert!(!client.is_registered());

    feed(&client, &[":irc.example.net 001 stwtestbot :Welcome to the network"]);
    assert_eq!(transport.take(), vec!["MODE stwtestbot +Q"]);
    assert!(client.is_registered());
    assert_eq!(client.nickname(), "stwtestbot");
    assert!(client.has_capability(&Capability::ExtendedJoin));
    assert!(!client.has_capability(&Capability::AccountTag));
}

#[test]
fn test_sasl_plain_end_to_end() {
    let mut config = make_config();
    config.auth_to_services = true;
    config.services_password = Some("hunter2".into());
    let (client, transport) = make_client(config);

    client.start();
    feed(&client, &[":irc.example.net CAP * LS :sasl=PLAIN multi-prefix"]);
    assert_eq!(transport.take(), vec!["CAP LS 302", "CAP REQ :sasl multi-prefix"]);

    feed(&client, &[":irc.example.net CAP * ACK :sasl multi-prefix", "AUTHENTICATE +"]);
    let sent = transport.take();
    assert_eq!(sent[0], "AUTHENTICATE PLAIN");
    // base64("\0stwtestbot\0hunter2")
    assert_eq!(sent[1], "AUTHENTICATE AHN0d3Rlc3Rib3QAaHVudGVyMg==");

    feed(
        &client,
        &[
            ":irc.example.net 900 stwtestbot stwtestbot!username@host stwtestbot \
             :You are now logged in as stwtestbot",
            ":irc.example.net 903 stwtestbot :SASL authentication successful",
        ],
    );
    assert!(client.is_logged_in());
    // SASL replaces PASS
    assert_eq!(
        transport.take(),
        vec!["CAP END", "USER username * * :real name", "NICK stwtestbot"]
    );
}

#[tokio::test]
async fn test_sasl_failure_tears_down() {
    let mut config = make_config();
    config.auth_to_services = true;
    config.services_password = Some("wrong".into());
    let (client, transport) = make_client(config);
    let events = common::record_events(&client);

    client.start();
    feed(
        &client,
        &[
            ":irc.example.net CAP * LS :sasl",
            ":irc.example.net CAP * ACK :sasl",
            "AUTHENTICATE +",
            ":irc.example.net 904 stwtestbot :SASL authentication failed",
        ],
    );

    assert!(transport.take().iter().any(|l| l.starts_with("QUIT")));
    assert!(!transport_connected(&transport));
    assert!(matches!(client.wait_until_registered().await, Err(ClientError::Disconnected)));
    assert_eq!(common::kinds(&events), vec![slirc_client::EventKind::Disconnected]);
}

fn transport_connected(transport: &common::RecordingTransport) -> bool {
    use slirc_client::Transport;
    transport.is_connected()
}

#[test]
fn test_nick_in_use_during_registration() {
    let (client, transport) = make_client(make_config());
    client.start();
    feed(
        &client,
        &[
            ":irc.example.net CAP * LS :identify-msg",
            ":irc.example.net 433 * stwtestbot :Nickname is already in use",
        ],
    );
    assert_eq!(transport.take().last().map(String::as_str), Some("NICK stwtestbot_"));

    feed(&client, &[":irc.example.net 001 stwtestbot_ :Welcome"]);
    assert_eq!(client.nickname(), "stwtestbot_");
    assert_eq!(client.intended_nickname(), "stwtestbot");
}

#[test]
fn test_cap_del_drops_coupled_capability() {
    let mut config = make_config();
    config.supported_capabilities = Some(vec![
        "account-notify".into(),
        "extended-join".into(),
        "cap-notify".into(),
    ]);
    let (client, transport) = make_client(config);
    client.start();
    feed(
        &client,
        &[
            ":irc.example.net CAP * LS :account-notify extended-join cap-notify",
            ":irc.example.net CAP * ACK :account-notify extended-join cap-notify",
            ":irc.example.net 001 stwtestbot :Welcome",
        ],
    );
    transport.take();

    feed(&client, &[":irc.example.net CAP stwtestbot DEL :account-notify"]);
    assert_eq!(transport.take(), vec!["CAP REQ -extended-join"]);
    assert!(!client.has_capability(&Capability::AccountNotify));

    feed(&client, &[":irc.example.net CAP stwtestbot ACK :-extended-join"]);
    assert!(!client.has_capability(&Capability::ExtendedJoin));
    assert!(client.has_capability(&Capability::CapNotify));
}

#[tokio::test]
async fn test_operations_wait_for_welcome() {
    let (client, transport) = make_client(make_config());
    client.start();
    feed(
        &client,
        &[":irc.example.net CAP * LS :multi-prefix", ":irc.example.net CAP * ACK :multi-prefix"],
    );
    transport.take();

    let joiner = client.clone();
    let join = tokio::spawn(async move { joiner.join_channel("#wikipedia-en-help").await });
    tokio::task::yield_now().await;
    assert!(transport.take().is_empty());

    feed(&client, &[":irc.example.net 001 stwtestbot :Welcome"]);
    join.await.unwrap().unwrap();
    assert_eq!(transport.take(), vec!["MODE stwtestbot +Q", "JOIN #wikipedia-en-help"]);
}

#[tokio::test]
async fn test_mask_compilation_waits_for_welcome() {
    let (client, transport) = make_client(make_config());
    client.start();
    feed(
        &client,
        &[":irc.example.net CAP * LS :multi-prefix", ":irc.example.net CAP * ACK :multi-prefix"],
    );
    transport.take();

    let compiler = client.clone();
    let compile = tokio::spawn(async move { compiler.compile_mask("$a:stwalkerster").await });
    tokio::task::yield_now().await;
    assert!(!compile.is_finished());

    feed(
        &client,
        &[
            ":irc.example.net 001 stwtestbot :Welcome",
            ":irc.example.net 005 stwtestbot EXTBAN=$,ajrxz :are supported by this server",
        ],
    );
    match compile.await.unwrap().unwrap() {
        HostMask::Extban { kind, param, .. } => {
            assert_eq!(kind, 'a');
            assert_eq!(param.as_deref(), Some("stwalkerster"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_status_message_requires_statusmsg() {
    let (client, transport) = registered_client();

    let result = client
        .send_message("#wikipedia-en-help", "ops only", Some(DestinationFlag::ChannelOperators))
        .await;
    assert!(matches!(result, Err(ClientError::UnsupportedDestinationFlag('@'))));

    feed(&client, &[":irc.example.net 005 stwtestbot STATUSMSG=@+ :are supported by this server"]);
    client
        .send_message("#wikipedia-en-help", "ops only", Some(DestinationFlag::ChannelOperators))
        .await
        .unwrap();
    client
        .send_notice("#wikipedia-en-help", "voiced", Some(DestinationFlag::VoicedUsers))
        .await
        .unwrap();
    assert_eq!(
        transport.take(),
        vec!["PRIVMSG @#wikipedia-en-help :ops only", "NOTICE +#wikipedia-en-help voiced"]
    );
}

#[tokio::test]
async fn test_join_zero_is_refused() {
    let (client, transport) = registered_client();
    assert!(matches!(client.join_channel("0").await, Err(ClientError::JoinZeroRejected)));
    assert!(transport.take().is_empty());
}

#[tokio::test]
async fn test_set_nickname_waits_for_server() {
    let (client, transport) = registered_client();
    client.set_nickname("stwbot2").unwrap();
    assert_eq!(transport.take(), vec!["NICK stwbot2"]);
    assert_eq!(client.nickname(), "stwtestbot");
    assert_eq!(client.intended_nickname(), "stwbot2");

    feed(&client, &[":stwtestbot!username@host NICK stwbot2"]);
    assert_eq!(client.nickname(), "stwbot2");
}
