use std::sync::OnceLock;
use tfhe::{generate_keys, ClientKey, CompressedPublicKey, ConfigBuilder};

struct TestKeyMaterial {
    client_key_bytes: Vec<u8>,
    public_key_bytes: Vec<u8>,
}

static TEST_KEYS: OnceLock<TestKeyMaterial> = OnceLock::new();

pub fn get_test_keys() -> (ClientKey, CompressedPublicKey) {
    let material = TEST_KEYS.get_or_init(|| {
        let config = ConfigBuilder::default().build();
        let (client_key, _server_key) = generate_keys(config);
        let public_key = CompressedPublicKey::new(&client_key);

        TestKeyMaterial {
            client_key_bytes: bincode::serialize(&client_key).unwrap(),
            public_key_bytes: bincode::serialize(&public_key).unwrap(),
        }
    });

    (
        bincode::deserialize(&material.client_key_bytes).unwrap(),
        bincode::deserialize(&material.public_key_bytes).unwrap(),
    )
}
