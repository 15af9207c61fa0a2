use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::float::Float;
use crate::index::VarAddr;
use crate::opcode::OpCode;

use super::{Player, PlayerParts};

impl<F: Float + Serialize> Serialize for Player<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.has_callbacks() {
            return Err(serde::ser::Error::custom(
                "cannot serialize a Player that calls discrete or atomic functions; \
                 they are user code and must be recorded again after loading",
            ));
        }
        let mut s = serializer.serialize_struct("Player", 8)?;
        s.serialize_field("ops", &self.ops)?;
        s.serialize_field("args", &self.args)?;
        s.serialize_field("constants", &self.constants)?;
        s.serialize_field("texts", &self.texts)?;
        s.serialize_field("vec_ad", &self.vec_ad)?;
        s.serialize_field("num_load", &self.num_load)?;
        s.serialize_field("independents", &self.independents)?;
        s.serialize_field("dependents", &self.dependents)?;
        s.end()
    }
}

/// Deserialization re-runs the structural checks of [`Player::new`].
impl<'de, F: Float + Deserialize<'de>> Deserialize<'de> for Player<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct PlayerData<F> {
            ops: Vec<OpCode>,
            args: Vec<u32>,
            constants: Vec<F>,
            #[serde(default)]
            texts: Vec<String>,
            #[serde(default)]
            vec_ad: Vec<u32>,
            #[serde(default)]
            num_load: usize,
            independents: Vec<VarAddr>,
            dependents: Vec<VarAddr>,
        }

        let data = PlayerData::<F>::deserialize(deserializer)?;
        Player::new(PlayerParts {
            ops: data.ops,
            args: data.args,
            constants: data.constants,
            texts: data.texts,
            vec_ad: data.vec_ad,
            num_load: data.num_load,
            independents: data.independents,
            dependents: data.dependents,
            discretes: Vec::new(),
            atomics: Vec::new(),
        })
        .map_err(serde::de::Error::custom)
    }
}
