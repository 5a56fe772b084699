//! RFC 7919 finite-field groups (ffdhe2048, ffdhe3072). Generator is 2.

use ferrotls_bignum::BigNum;
use ferrotls_types::{CryptoError, DhParamId};

/// Prime modulus and generator of a named FFDHE group.
pub(crate) fn ffdhe_params(id: DhParamId) -> Result<(BigNum, BigNum), CryptoError> {
    let p = match id {
        DhParamId::Ffdhe2048 => BigNum::from_hex(FFDHE2048_P)?,
        DhParamId::Ffdhe3072 => BigNum::from_hex(FFDHE3072_P)?,
    };
    Ok((p, BigNum::from_u64(2)))
}

// RFC 7919 appendix A.1
const FFDHE2048_P: &str = "\
FFFFFFFFFFFFFFFFADF85458a2bb4a9aafdc5620273d3cf1\
d8b9c583ce2d3695a9e13641146433fbcc939dce249b3ef9\
7d2fe363630c75d8f681b202aec4617ad3df1ed5d5fd6561\
2433f51f5f066ed0856365553ded1af3b557135e7f57c935\
984f0c70e0e68b77e2a689daf3efe8721df158a136ade735\
30acca4f483a797abc0ab182b324fb61d108a94bb2c8e3fb\
b96adab760d7f4681d4f42a3de394df4ae56ede76372bb19\
0b07a7c8ee0a6d709e02fce1cdf7e2ecc03404cd28342f61\
9172fe9ce98583ff8e4f1232eef28183c3fe3b1b4c6fad73\
3bb5fcbc2ec22005c58ef1837d1683b2c6f34a26c1b2effa\
886b423861285c97ffffffffffffffff";

// RFC 7919 appendix A.2
const FFDHE3072_P: &str = "\
FFFFFFFFFFFFFFFFADF85458a2bb4a9aafdc5620273d3cf1\
d8b9c583ce2d3695a9e13641146433fbcc939dce249b3ef9\
7d2fe363630c75d8f681b202aec4617ad3df1ed5d5fd6561\
2433f51f5f066ed0856365553ded1af3b557135e7f57c935\
984f0c70e0e68b77e2a689daf3efe8721df158a136ade735\
30acca4f483a797abc0ab182b324fb61d108a94bb2c8e3fb\
b96adab760d7f4681d4f42a3de394df4ae56ede76372bb19\
0b07a7c8ee0a6d709e02fce1cdf7e2ecc03404cd28342f61\
9172fe9ce98583ff8e4f1232eef28183c3fe3b1b4c6fad73\
3bb5fcbc2ec22005c58ef1837d1683b2c6f34a26c1b2effa\
886b4238611fcfdcde355b3b6519035bbc34f4def99c0238\
61b46fc9d6e6c9077ad91d2691f7f7ee598cb0fac186d91c\
aefe130985139270b4130c93bc437944f4fd4452e2d74dd3\
64f2e21e71f54bff5cae82ab9c9df69ee86d2bc522363a0d\
abc521979b0deada1dbf9a42d5c4484e0abcd06bfa53ddef\
3c1b20ee3fd59d7c25e41d2b66c62e37ffffffffffffffff";
